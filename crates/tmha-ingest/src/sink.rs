//! Destinations for parsed archive batches

use async_trait::async_trait;
use std::sync::Mutex;
use tmha_common::{ArchiveBatch, CaseRecord};

use crate::error::{IngestError, Result};

/// Receives one batch per successfully parsed archive.
///
/// Implementations must make each batch all-or-nothing: when `save_batch`
/// returns an error, none of that batch's records may remain visible.
/// Whether calls can overlap is decided by the scheduler's
/// [`WritePolicy`](crate::config::WritePolicy), not by the sink.
#[async_trait]
pub trait BatchSink: Send + Sync {
    async fn save_batch(&self, batch: ArchiveBatch) -> Result<()>;
}

/// Sink that keeps every batch in memory, in arrival order
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Mutex<Vec<ArchiveBatch>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches received so far
    pub fn batches(&self) -> Result<Vec<ArchiveBatch>> {
        self.batches
            .lock()
            .map(|b| b.clone())
            .map_err(|_| IngestError::sink("memory sink lock poisoned"))
    }

    /// Consume the sink, flattening every batch into one list
    pub fn into_records(self) -> Result<Vec<CaseRecord>> {
        self.batches
            .into_inner()
            .map(|b| b.into_iter().flatten().collect())
            .map_err(|_| IngestError::sink("memory sink lock poisoned"))
    }
}

#[async_trait]
impl BatchSink for MemorySink {
    async fn save_batch(&self, batch: ArchiveBatch) -> Result<()> {
        self.batches
            .lock()
            .map_err(|_| IngestError::sink("memory sink lock poisoned"))?
            .push(batch);
        Ok(())
    }
}
