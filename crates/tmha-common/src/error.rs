//! Error types for TMHA

use thiserror::Error;

/// Result type alias for TMHA operations
pub type Result<T> = std::result::Result<T, TmhaError>;

/// Main error type for TMHA
#[derive(Error, Debug)]
pub enum TmhaError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TmhaError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
