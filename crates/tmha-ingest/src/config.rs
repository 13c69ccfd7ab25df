//! Ingestion configuration

use std::path::PathBuf;
use tmha_common::{Result, TmhaError};

/// Scratch directory name under the system temp dir
pub const DEFAULT_SCRATCH_DIR_NAME: &str = "TrademarkHistoryAnalysisXml";

/// Record-level element of the annual archive XML
pub const DEFAULT_RECORD_ELEMENT: &str = "case-file";

/// How the scheduler guards calls into the sink. Chosen per
/// [`IngestScheduler::run`](crate::scheduler::IngestScheduler::run) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// One sink call at a time across all workers
    #[default]
    Serialized,
    /// Sink is called as soon as a batch is ready; it must tolerate
    /// concurrent callers
    Concurrent,
}

impl WritePolicy {
    /// Map a "parallel writes" switch to a policy
    pub fn from_parallel_writes(parallel: bool) -> Self {
        if parallel {
            Self::Concurrent
        } else {
            Self::Serialized
        }
    }
}

/// Ingestion configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Where archives are extracted before parsing
    pub scratch_dir: PathBuf,

    /// Archives processed at once
    pub concurrency: usize,

    /// Name of the repeating record element
    pub record_element: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir().join(DEFAULT_SCRATCH_DIR_NAME),
            concurrency: default_concurrency(),
            record_element: DEFAULT_RECORD_ELEMENT.to_string(),
        }
    }
}

impl IngestConfig {
    /// Create new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment and defaults
    ///
    /// - `TMHA_SCRATCH_DIR`: extraction directory
    /// - `TMHA_CONCURRENCY`: worker count
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(dir) = std::env::var("TMHA_SCRATCH_DIR") {
            config.scratch_dir = PathBuf::from(dir);
        }

        if let Ok(raw) = std::env::var("TMHA_CONCURRENCY") {
            config.concurrency = raw.trim().parse().map_err(|_| {
                TmhaError::config(format!("TMHA_CONCURRENCY must be a positive integer, got '{}'", raw))
            })?;
        }

        config.validate()?;

        Ok(config)
    }

    /// Set scratch directory
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Set concurrency level
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set record element name
    pub fn with_record_element(mut self, name: impl Into<String>) -> Self {
        self.record_element = name.into();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(TmhaError::config("concurrency must be greater than 0"));
        }

        if self.record_element.trim().is_empty() {
            return Err(TmhaError::config("record element name cannot be empty"));
        }

        Ok(())
    }
}

/// Number of available processing units, falling back to one
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
