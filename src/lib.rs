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

//! Streaming mysqldump anonymizer in Rust
//!
//! This crate reads a mysqldump file as a stream, replaces configured
//! column values of its `INSERT` statements with generated fake data and
//! writes everything else through untouched. Its intended usage is to
//! anonymize a production backup so it can be safely shared between
//! developers.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mysqldump_anonymizer::{
//!     Catalog, FieldAnonymizer, MySqlEngine, Pipeline, PipelineOptions, Registry,
//!     StatementWorker,
//! };
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let anonymizer = FieldAnonymizer::new(
//!     Arc::new(Catalog::from_path("config.json")?),
//!     Arc::new(Registry::builtin()),
//! );
//! let worker = StatementWorker::new(Arc::new(MySqlEngine::new()), anonymizer);
//!
//! let input = tokio::io::BufReader::new(tokio::io::stdin());
//! Pipeline::new(worker, PipelineOptions::default())
//!     .run(input, tokio::io::stdout())
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!

#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod anonymizer;
pub mod assembler;
pub mod ast;
pub mod catalog;
pub mod dialect;
pub mod engine;
pub mod generator;
pub mod parser;
pub mod pipeline;
pub mod tokenizer;

pub use anonymizer::{AnonymizeReport, FieldAnonymizer, RuleError};
pub use catalog::{Catalog, CatalogError};
pub use engine::{MySqlEngine, SerializeError, SqlEngine};
pub use generator::{Generator, Registry};
pub use parser::{Parser, ParserError};
pub use pipeline::{Pipeline, PipelineError, PipelineOptions, StatementWorker};
pub use tokenizer::Token;
