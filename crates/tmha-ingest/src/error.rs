//! Error types for archive ingestion
//!
//! Incomplete `case-file` elements are not errors: the extractor reports
//! them as `Ok(None)` and the pipeline moves on. Everything here fails the
//! archive it was raised for.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// Archive cannot be opened, read, or holds no entries
    #[error("Failed to extract archive '{}': {reason}", archive.display())]
    Extraction { archive: PathBuf, reason: String },

    /// Document is not well-formed or ends inside a record
    #[error("Malformed XML in '{}': {message}", path.display())]
    Xml { path: PathBuf, message: String },

    /// Required field of a structurally complete record cannot be parsed
    #[error("Invalid value for '{field}': '{value}' ({reason})")]
    Field {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// Storage layer rejected a batch; the batch was rolled back
    #[error("Persistence failed: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Caller-supplied sink failed
    #[error("Sink failed: {0}")]
    Sink(String),

    /// Blocking parse task panicked or was cancelled
    #[error("Worker failed: {0}")]
    Worker(String),

    /// Several archives failed independently during one run
    #[error("{} archive(s) failed: {}", .0.len(), FailureList(.0))]
    Aggregate(Vec<FileFailure>),

    #[error("Configuration error: {0}")]
    Config(#[from] tmha_common::TmhaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    pub fn extraction(archive: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::Extraction {
            archive: archive.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn xml(path: impl AsRef<Path>, message: impl fmt::Display) -> Self {
        Self::Xml {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn field(field: &'static str, value: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Field {
            field,
            value: value.into(),
            reason: reason.to_string(),
        }
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// True for failures raised while reading an archive, as opposed to
    /// storing its batch.
    pub fn is_extraction(&self) -> bool {
        matches!(
            self,
            Self::Extraction { .. } | Self::Xml { .. } | Self::Field { .. } | Self::Worker(_)
        )
    }

    /// Reclassify an error raised while reading `archive` so it counts as an
    /// extraction failure. Extraction-stage variants are returned unchanged.
    pub fn into_extraction(self, archive: impl AsRef<Path>) -> Self {
        if self.is_extraction() {
            self
        } else {
            Self::extraction(archive, self.to_string())
        }
    }

    /// Failures of every archive in the run, or this single one if it is not
    /// an aggregate.
    pub fn failures(&self) -> Vec<&IngestError> {
        match self {
            Self::Aggregate(failures) => failures.iter().map(|f| &f.error).collect(),
            other => vec![other],
        }
    }
}

/// One archive's failure within a run
#[derive(Debug)]
pub struct FileFailure {
    pub archive: PathBuf,
    pub error: IngestError,
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.archive.display(), self.error)
    }
}

struct FailureList<'a>(&'a [FileFailure]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}
