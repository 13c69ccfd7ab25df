//! Concurrent ingestion scheduler
//!
//! Archives are processed with bounded parallelism: each one is extracted
//! and parsed on the blocking pool, then its batch goes to the sink. With
//! [`WritePolicy::Serialized`] a scheduler-owned lock makes sink calls
//! mutually exclusive; with [`WritePolicy::Concurrent`] the sink is called
//! as soon as each batch is ready.
//!
//! A failing archive never stops the others. Failures are gathered until
//! every archive has finished and then reported together.

use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tmha_common::CaseRecord;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::{IngestConfig, WritePolicy};
use crate::error::{FileFailure, IngestError, Result};
use crate::extract;
use crate::sink::{BatchSink, MemorySink};
use crate::workspace::Workspace;

/// Totals for a run in which every archive succeeded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub archives: usize,
    pub records: usize,
}

/// Runs the archive pipeline over many files
pub struct IngestScheduler {
    workspace: Arc<Workspace>,
    config: IngestConfig,
}

impl IngestScheduler {
    pub fn new(workspace: Arc<Workspace>, config: IngestConfig) -> Self {
        Self { workspace, config }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Parse every archive and hand each batch to `sink`.
    ///
    /// Returns once all archives have completed or failed. A single failure
    /// raised by the sink is returned as is; any other failing run yields
    /// [`IngestError::Aggregate`] naming every failed archive.
    pub async fn run(
        &self,
        archives: &[PathBuf],
        sink: Arc<dyn BatchSink>,
        policy: WritePolicy,
    ) -> Result<RunSummary> {
        if archives.is_empty() {
            info!("No archives to ingest");
            return Ok(RunSummary::default());
        }

        let started = Instant::now();
        let concurrency = self.config.concurrency.max(1);
        let write_lock = Arc::new(Mutex::new(()));

        info!(
            archives = archives.len(),
            concurrency,
            policy = ?policy,
            "Starting ingestion run"
        );

        let outcomes: Vec<(PathBuf, Result<usize>)> = stream::iter(archives.iter().cloned())
            .map(|archive| {
                let workspace = Arc::clone(&self.workspace);
                let record_element = self.config.record_element.clone();
                let sink = Arc::clone(&sink);
                let write_lock = Arc::clone(&write_lock);

                async move {
                    let outcome = ingest_one(
                        workspace,
                        archive.clone(),
                        record_element,
                        sink.as_ref(),
                        &write_lock,
                        policy,
                    )
                    .await;
                    (archive, outcome)
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut summary = RunSummary::default();
        let mut failures = Vec::new();

        for (archive, outcome) in outcomes {
            match outcome {
                Ok(records) => {
                    summary.archives += 1;
                    summary.records += records;
                }
                Err(e) => {
                    error!(archive = %archive.display(), error = %e, "Archive failed");
                    failures.push(FileFailure { archive, error: e });
                }
            }
        }

        info!(
            succeeded = summary.archives,
            failed = failures.len(),
            records = summary.records,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ingestion run finished"
        );

        if failures.is_empty() {
            Ok(summary)
        } else {
            Err(combine_failures(failures))
        }
    }

    /// Parse every archive into memory and return all records.
    ///
    /// Records of one archive stay in stream order; archives are appended in
    /// completion order.
    pub async fn collect(&self, archives: &[PathBuf]) -> Result<Vec<CaseRecord>> {
        let sink = Arc::new(MemorySink::new());
        self.run(archives, sink.clone(), WritePolicy::Concurrent).await?;

        Arc::try_unwrap(sink)
            .map_err(|_| IngestError::sink("memory sink still shared after run"))?
            .into_records()
    }
}

async fn ingest_one(
    workspace: Arc<Workspace>,
    archive: PathBuf,
    record_element: String,
    sink: &dyn BatchSink,
    write_lock: &Mutex<()>,
    policy: WritePolicy,
) -> Result<usize> {
    // Anything raised before the batch exists belongs to the read side,
    // whatever its variant.
    let batch = tokio::task::spawn_blocking(move || {
        extract::parse_archive(&workspace, &archive, &record_element)
            .map_err(|e| e.into_extraction(&archive))
    })
    .await
    .map_err(|e| IngestError::Worker(e.to_string()))??;

    let records = batch.len();
    match policy {
        WritePolicy::Serialized => {
            let _guard = write_lock.lock().await;
            sink.save_batch(batch).await?;
        }
        WritePolicy::Concurrent => sink.save_batch(batch).await?,
    }

    Ok(records)
}

/// A lone failure from the write path is surfaced unwrapped; everything
/// else is reported as an aggregate.
fn combine_failures(mut failures: Vec<FileFailure>) -> IngestError {
    if failures.len() == 1 && !failures[0].error.is_extraction() {
        if let Some(failure) = failures.pop() {
            return failure.error;
        }
    }
    IngestError::Aggregate(failures)
}
