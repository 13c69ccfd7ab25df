//! TMHA Ingest - load trademark case-file archives into SQLite

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tmha_common::logging::{init_logging, LogConfig, LogLevel};
use tmha_ingest::{
    discover_archives, IngestConfig, IngestScheduler, SqliteCaseStore, Workspace, WritePolicy,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tmha-ingest")]
#[command(author, version, about = "Load trademark case-file archives into a SQLite database")]
struct Cli {
    /// Archive file, or directory of .zip archives
    source: PathBuf,

    /// Database file to create; must not exist yet
    database: PathBuf,

    /// Archives processed at once (defaults to available CPUs)
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Let workers write batches concurrently instead of one at a time
    #[arg(long, env = "TMHA_PARALLEL_WRITES")]
    parallel_writes: bool,

    /// Directory for extracted XML files
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("tmha-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    if cli.database.exists() {
        bail!(
            "Database '{}' already exists; choose a new path",
            cli.database.display()
        );
    }

    if !cli.source.exists() {
        bail!("Source '{}' does not exist", cli.source.display());
    }

    let mut config = IngestConfig::from_env()?;
    if let Some(concurrency) = cli.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(dir) = cli.scratch_dir {
        config = config.with_scratch_dir(dir);
    }
    config.validate()?;

    let archives = discover_archives(&cli.source)
        .with_context(|| format!("Failed to list archives in '{}'", cli.source.display()))?;
    info!(count = archives.len(), source = %cli.source.display(), "Found archives");

    if archives.is_empty() {
        info!("Nothing to ingest");
        return Ok(());
    }

    let workspace = Arc::new(
        Workspace::prepare(&config.scratch_dir).context("Failed to prepare scratch directory")?,
    );

    let store = SqliteCaseStore::open(&cli.database)
        .await
        .context("Failed to open database")?;
    store.create_schema().await.context("Failed to create schema")?;

    let policy = WritePolicy::from_parallel_writes(cli.parallel_writes);
    let scheduler = IngestScheduler::new(workspace, config);
    let summary = scheduler
        .run(&archives, Arc::new(store.clone()), policy)
        .await
        .context("Ingestion failed")?;

    store.close().await;

    info!(
        archives = summary.archives,
        records = summary.records,
        database = %cli.database.display(),
        "Ingestion complete"
    );

    Ok(())
}
