//! TMHA Common Library
//!
//! Shared types, error handling and logging for the trademark history
//! analysis workspace.
//!
//! # Overview
//!
//! - **Types**: the flat case-file record produced by ingestion
//! - **Error Handling**: shared error type and result alias
//! - **Logging**: tracing subscriber setup for every binary
//!
//! # Example
//!
//! ```no_run
//! use tmha_common::types::parse_archive_date;
//! use tmha_common::Result;
//!
//! fn filing_year(raw: &str) -> Result<i32> {
//!     use chrono::Datelike;
//!     Ok(parse_archive_date(raw)?.year())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, TmhaError};
pub use types::{ArchiveBatch, CaseRecord, Classification, HOME_COUNTRY};
