//! Case-file record types shared by the ingest pipeline and its sinks

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TmhaError};

/// Country code recorded for owners whose nationality names no country.
pub const HOME_COUNTRY: &str = "US";

/// Date layout used throughout the annual archive XML (`yyyyMMdd`).
pub const ARCHIVE_DATE_FORMAT: &str = "%Y%m%d";

/// One trademark application or registration.
///
/// Built once per eligible `case-file` element and never mutated afterwards.
///
/// # Examples
///
/// ```rust,ignore
/// use tmha_common::types::{CaseRecord, Classification};
///
/// let record = CaseRecord {
///     filing_date: chrono::NaiveDate::from_ymd_opt(2018, 1, 2).unwrap(),
///     serial_number: 87_000_001,
///     registration_date: None,
///     registration_number: None,
///     owner: "ACME CORP".to_string(),
///     owner_type_id: 3,
///     state: Some("CA".to_string()),
///     country: "US".to_string(),
///     attorney: None,
///     status_code: 630,
///     mark_literal_elements: Some("ACME".to_string()),
///     classifications: vec![Classification::new(Some(9), Some("software".to_string()))],
/// };
/// assert!(record.has_home_jurisdiction());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Date the application was filed
    pub filing_date: NaiveDate,

    /// USPTO serial number
    pub serial_number: i64,

    /// Registration date, absent for marks that never registered
    pub registration_date: Option<NaiveDate>,

    /// Registration number, absent when the source omits it
    pub registration_number: Option<i64>,

    /// Owner party name
    pub owner: String,

    /// Owner legal-entity-type code
    pub owner_type_id: i32,

    /// Owner state; set only when nationality names a state
    pub state: Option<String>,

    /// Owner country; [`HOME_COUNTRY`] unless nationality overrides it
    pub country: String,

    /// Correspondent attorney name
    pub attorney: Option<String>,

    /// Case status code
    pub status_code: i32,

    /// Literal text of the mark
    pub mark_literal_elements: Option<String>,

    /// International classes, in declaration order
    pub classifications: Vec<Classification>,
}

impl CaseRecord {
    /// True when the owner is recorded against the home country, either via
    /// a state or because no explicit country override was present.
    pub fn has_home_jurisdiction(&self) -> bool {
        self.country == HOME_COUNTRY
    }
}

/// One international class entry of a [`CaseRecord`].
///
/// Codes and goods/services texts are paired by position only; the archive
/// carries no key linking the two lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Classification {
    /// International class code, `None` when missing or unparsable
    pub international_code: Option<i32>,

    /// Goods and services text declared at the same position
    pub goods_and_services: Option<String>,
}

impl Classification {
    pub fn new(international_code: Option<i32>, goods_and_services: Option<String>) -> Self {
        Self {
            international_code,
            goods_and_services,
        }
    }
}

/// All records extracted from one archive file, in stream order.
pub type ArchiveBatch = Vec<CaseRecord>;

/// Parse an archive date (`yyyyMMdd`, surrounding whitespace ignored).
pub fn parse_archive_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.len() != 8 {
        return Err(TmhaError::parse(format!(
            "expected 8-digit date, got '{}'",
            trimmed
        )));
    }

    NaiveDate::parse_from_str(trimmed, ARCHIVE_DATE_FORMAT)
        .map_err(|e| TmhaError::parse(format!("invalid date '{}': {}", trimmed, e)))
}
