// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Anonymize a mysqldump read from stdin and write it to stdout.
//!
//! ```bash
//! mysqldump mydb | mysqldump-anonymizer -c config.json > anonymized.sql
//! LOG_LEVEL=debug mysqldump-anonymizer -c config.json < dump.sql > out.sql
//! ```

use std::env;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{info, warn, LevelFilter};
use simple_logger::SimpleLogger;

use mysqldump_anonymizer::{
    Catalog, FieldAnonymizer, MySqlEngine, Pipeline, PipelineOptions, Registry, StatementWorker,
};

/// Input buffer size for stdin.
const READ_BUFFER: usize = 2 * 1024 * 1024;

#[derive(Parser)]
#[command(name = "mysqldump-anonymizer")]
#[command(about = "Replace sensitive values in a mysqldump stream with fake data")]
struct Cli {
    /// Path to the JSON pattern catalog
    #[arg(short, long)]
    config: PathBuf,

    /// Statements queued ahead of the writer
    #[arg(long, default_value = "10")]
    queue_capacity: NonZeroUsize,

    /// Statements anonymized concurrently (default: number of CPUs)
    #[arg(long)]
    workers: Option<NonZeroUsize>,

    /// Seed the value generators for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Process a last INSERT missing its `;` instead of dropping it
    #[arg(long)]
    flush_unterminated: bool,
}

fn log_level() -> LevelFilter {
    match env::var("LOG_LEVEL") {
        Ok(level) => parse_level(&level).unwrap_or_else(|| {
            eprintln!("Unknown LOG_LEVEL {:?}, using info", level);
            LevelFilter::Info
        }),
        Err(_) => LevelFilter::Info,
    }
}

/// `log` level names, plus the logrus spellings `warning`, `fatal` and `panic`.
fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => Some(LevelFilter::Warn),
        "fatal" | "panic" => Some(LevelFilter::Error),
        other => other.parse().ok(),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    SimpleLogger::new()
        .with_level(log_level())
        .init()
        .context("failed to initialize logger")?;

    let catalog = Catalog::from_path(&cli.config)
        .with_context(|| format!("failed to load catalog {}", cli.config.display()))?;

    let mut registry = Registry::builtin();
    if let Some(seed) = cli.seed {
        registry = registry.with_seed(seed);
    }
    for unknown in catalog.unknown_types(&registry) {
        warn!("{}", unknown);
    }

    let mut options = PipelineOptions {
        queue_capacity: cli.queue_capacity,
        flush_unterminated: cli.flush_unterminated,
        ..PipelineOptions::default()
    };
    if let Some(workers) = cli.workers {
        options.workers = workers;
    }

    let anonymizer = FieldAnonymizer::new(Arc::new(catalog), Arc::new(registry));
    let worker = StatementWorker::new(Arc::new(MySqlEngine::new()), anonymizer);

    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    let written = runtime.block_on(async {
        let input = tokio::io::BufReader::with_capacity(READ_BUFFER, tokio::io::stdin());
        Pipeline::new(worker, options)
            .run(input, tokio::io::stdout())
            .await
    })?;
    info!("Done, {} units written", written);

    Ok(())
}
