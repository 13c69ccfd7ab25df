//! SQLite persistence for case files
//!
//! Each batch is written inside one transaction so a failed archive leaves
//! nothing behind. Classifications keep their position within the record so
//! that [`SqliteCaseStore::get_all`] returns records exactly as they were
//! saved.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tmha_common::{ArchiveBatch, CaseRecord, Classification};
use tracing::{debug, info};

use crate::error::Result;
use crate::sink::BatchSink;

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_CONNECTIONS: u32 = 4;

/// Case-file store backed by a SQLite database file
#[derive(Clone)]
pub struct SqliteCaseStore {
    pool: SqlitePool,
}

impl SqliteCaseStore {
    /// Open (creating if missing) the database at `path`
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        info!(database = %path.display(), "Opened case-file store");
        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply schema migrations; safe to call more than once
    pub async fn create_schema(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;
        Ok(())
    }

    /// Insert every record of `batch` atomically
    pub async fn insert_batch(&self, batch: &[CaseRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for record in batch {
            let case_file_id = sqlx::query(
                r#"
                INSERT INTO case_files (
                    filing_date, serial_number, registration_date, registration_number,
                    owner, owner_type_id, state, country, attorney,
                    status_code, mark_literal_elements
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(record.filing_date)
            .bind(record.serial_number)
            .bind(record.registration_date)
            .bind(record.registration_number)
            .bind(&record.owner)
            .bind(record.owner_type_id)
            .bind(&record.state)
            .bind(&record.country)
            .bind(&record.attorney)
            .bind(record.status_code)
            .bind(&record.mark_literal_elements)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            for (position, class) in record.classifications.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO case_file_classes (case_file_id, position, international_code, goods_and_services)
                    VALUES (?1, ?2, ?3, ?4)
                    "#,
                )
                .bind(case_file_id)
                .bind(position as i64)
                .bind(class.international_code)
                .bind(&class.goods_and_services)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        debug!(records = batch.len(), "Committed batch");
        Ok(())
    }

    /// Every stored record in insertion order
    pub async fn get_all(&self) -> Result<Vec<CaseRecord>> {
        let class_rows = sqlx::query(
            r#"
            SELECT case_file_id, international_code, goods_and_services
            FROM case_file_classes
            ORDER BY case_file_id, position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut classes: HashMap<i64, Vec<Classification>> = HashMap::new();
        for row in class_rows {
            classes
                .entry(row.try_get("case_file_id")?)
                .or_default()
                .push(Classification::new(
                    row.try_get("international_code")?,
                    row.try_get("goods_and_services")?,
                ));
        }

        let rows = sqlx::query(
            r#"
            SELECT id, filing_date, serial_number, registration_date, registration_number,
                   owner, owner_type_id, state, country, attorney,
                   status_code, mark_literal_elements
            FROM case_files
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id")?;
            let filing_date: NaiveDate = row.try_get("filing_date")?;
            records.push(CaseRecord {
                filing_date,
                serial_number: row.try_get("serial_number")?,
                registration_date: row.try_get("registration_date")?,
                registration_number: row.try_get("registration_number")?,
                owner: row.try_get("owner")?,
                owner_type_id: row.try_get("owner_type_id")?,
                state: row.try_get("state")?,
                country: row.try_get("country")?,
                attorney: row.try_get("attorney")?,
                status_code: row.try_get("status_code")?,
                mark_literal_elements: row.try_get("mark_literal_elements")?,
                classifications: classes.remove(&id).unwrap_or_default(),
            });
        }

        Ok(records)
    }

    /// Number of stored case files
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM case_files")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl BatchSink for SqliteCaseStore {
    async fn save_batch(&self, batch: ArchiveBatch) -> Result<()> {
        self.insert_batch(&batch).await
    }
}
