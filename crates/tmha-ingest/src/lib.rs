//! TMHA Ingest Library
//!
//! Streaming ingestion of trademark case-file archives. Each archive is a
//! zip holding one large XML document; records are read one `case-file`
//! element at a time, filtered to the principal register, flattened into
//! [`CaseRecord`](tmha_common::CaseRecord)s and delivered to a sink as one
//! batch per archive.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tmha_ingest::{
//!     discover_archives, IngestConfig, IngestScheduler, SqliteCaseStore, Workspace, WritePolicy,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::from_env()?;
//!     let workspace = Arc::new(Workspace::prepare(&config.scratch_dir)?);
//!
//!     let store = SqliteCaseStore::open("./trademarks.db".as_ref()).await?;
//!     store.create_schema().await?;
//!
//!     let archives = discover_archives("./archives".as_ref())?;
//!     let scheduler = IngestScheduler::new(workspace, config);
//!     let summary = scheduler
//!         .run(&archives, Arc::new(store), WritePolicy::Serialized)
//!         .await?;
//!
//!     println!("{} records from {} archives", summary.records, summary.archives);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod classification;
pub mod config;
pub mod cursor;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod scheduler;
pub mod sink;
pub mod store;
pub mod workspace;

pub use config::{IngestConfig, WritePolicy};
pub use discovery::discover_archives;
pub use error::{FileFailure, IngestError, Result};
pub use extract::{parse_archive, parse_xml_file, try_extract};
pub use scheduler::{IngestScheduler, RunSummary};
pub use sink::{BatchSink, MemorySink};
pub use store::SqliteCaseStore;
pub use workspace::{ExtractedXml, Workspace};
