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

//! Ordered concurrent pipeline
//!
//! Every unit gets a result slot, queued in input order before any work on
//! it starts. Inserts are anonymized on blocking worker threads while the
//! writer drains the slot queue front to back, so the output keeps the
//! input's order no matter which worker finishes first. The bounded queue
//! holds the reader back when the writer falls behind.

use std::error::Error;
use std::fmt;
use std::io;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use log::{debug, error, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot, Semaphore};

use crate::anonymizer::FieldAnonymizer;
use crate::assembler::{StatementAssembler, Unit};
use crate::engine::SqlEngine;

/// Default number of result slots in flight.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

#[derive(Debug)]
pub enum PipelineError {
    /// Reading the dump failed. Units read before the failure were still
    /// written out.
    Input(io::Error),
    Output(io::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PipelineError::Input(e) => write!(f, "failed reading input: {}", e),
            PipelineError::Output(e) => write!(f, "failed writing output: {}", e),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Input(e) | PipelineError::Output(e) => Some(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Result slots queued ahead of the writer.
    pub queue_capacity: NonZeroUsize,
    /// Statements anonymized at the same time.
    pub workers: NonZeroUsize,
    /// Process a final statement missing its `;` instead of dropping it.
    pub flush_unterminated: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            queue_capacity: NonZeroUsize::new(DEFAULT_QUEUE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            workers: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
            flush_unterminated: false,
        }
    }
}

/// Parses, anonymizes and re-serializes one statement.
#[derive(Clone)]
pub struct StatementWorker {
    engine: Arc<dyn SqlEngine>,
    anonymizer: FieldAnonymizer,
}

impl StatementWorker {
    pub fn new(engine: Arc<dyn SqlEngine>, anonymizer: FieldAnonymizer) -> Self {
        StatementWorker { engine, anonymizer }
    }

    /// Output bytes for the statement `raw`. Anything that can't be parsed
    /// or serialized comes back as the original text.
    pub fn process(&self, raw: &[u8]) -> Vec<u8> {
        let sql = match std::str::from_utf8(raw) {
            Ok(sql) => sql,
            Err(e) => {
                error!(
                    "Failed parsing line with error: {}; line: {}",
                    e,
                    String::from_utf8_lossy(raw)
                );
                return original(raw);
            }
        };

        let mut statement = match self.engine.parse(sql) {
            Ok(statement) => statement,
            Err(e) => {
                error!("Failed parsing line with error: {}; line: {}", e, sql);
                return original(raw);
            }
        };

        self.anonymizer.apply(&mut statement);

        match self.engine.serialize(&statement) {
            Ok(mut text) => {
                text.push_str(";\n");
                text.into_bytes()
            }
            Err(e) => {
                error!("Failed recompiling line with error: {}; line: {}", e, sql);
                original(raw)
            }
        }
    }
}

fn original(raw: &[u8]) -> Vec<u8> {
    let mut text = raw.to_vec();
    text.push(b'\n');
    text
}

type Slot = oneshot::Receiver<Vec<u8>>;

/// Stream a dump from `input` to `output`, anonymizing inserts.
pub struct Pipeline {
    worker: StatementWorker,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(worker: StatementWorker, options: PipelineOptions) -> Self {
        Pipeline { worker, options }
    }

    /// Run until `input` is exhausted. Returns the number of units written.
    pub async fn run<R, W>(&self, input: R, mut output: W) -> Result<u64, PipelineError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        let (slots, mut pending) = mpsc::channel::<Slot>(self.options.queue_capacity.get());
        let producer = Producer {
            worker: self.worker.clone(),
            semaphore: Arc::new(Semaphore::new(self.options.workers.get())),
            slots,
            flush_unterminated: self.options.flush_unterminated,
        };
        let reading = tokio::spawn(producer.run(input));

        let mut written = 0;
        while let Some(slot) = pending.recv().await {
            match slot.await {
                Ok(text) => {
                    output
                        .write_all(&text)
                        .await
                        .map_err(PipelineError::Output)?;
                    written += 1;
                }
                Err(_) => error!("A statement worker exited without a result; unit skipped"),
            }
        }
        output.flush().await.map_err(PipelineError::Output)?;
        debug!("{} units written", written);

        match reading.await {
            Ok(Ok(())) => Ok(written),
            Ok(Err(e)) => Err(PipelineError::Input(e)),
            Err(e) => Err(PipelineError::Input(io::Error::new(
                io::ErrorKind::Other,
                e.to_string(),
            ))),
        }
    }
}

/// Reads lines, assembles units and dispatches them.
struct Producer {
    worker: StatementWorker,
    semaphore: Arc<Semaphore>,
    slots: mpsc::Sender<Slot>,
    flush_unterminated: bool,
}

/// The writer is gone; nothing more will be written.
struct Closed;

impl Producer {
    async fn run<R>(self, mut input: R) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut assembler = StatementAssembler::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = match input.read_until(b'\n', &mut line).await {
                Ok(read) => read,
                Err(e) => {
                    error!("{}", e);
                    return Err(e);
                }
            };
            if read == 0 {
                break;
            }
            if let Some(unit) = assembler.push_line(&line) {
                if self.dispatch(unit).await.is_err() {
                    return Ok(());
                }
            }
        }

        if let Some(fragment) = assembler.finish() {
            if self.flush_unterminated {
                debug!("Processing unterminated statement at end of input");
                let _ = self.dispatch(Unit::Candidate(fragment)).await;
            } else {
                warn!(
                    "Dropping unterminated statement at end of input: {}",
                    String::from_utf8_lossy(&fragment)
                );
            }
        }
        Ok(())
    }

    async fn dispatch(&self, unit: Unit) -> Result<(), Closed> {
        let (result, slot) = oneshot::channel();
        self.slots.send(slot).await.map_err(|_| Closed)?;

        match unit {
            Unit::Passthrough(text) => {
                let _ = result.send(text);
            }
            Unit::Candidate(sql) => {
                let permit = self.semaphore.clone().acquire_owned().await.ok();
                let worker = self.worker.clone();
                tokio::task::spawn_blocking(move || {
                    let text = panic::catch_unwind(AssertUnwindSafe(|| worker.process(&sql)))
                        .unwrap_or_else(|_| {
                            error!(
                                "Statement worker panicked; line: {}",
                                String::from_utf8_lossy(&sql)
                            );
                            original(&sql)
                        });
                    drop(permit);
                    let _ = result.send(text);
                });
            }
        }
        Ok(())
    }
}
