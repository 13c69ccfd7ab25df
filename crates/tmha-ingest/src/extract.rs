//! Case-file filtering and field extraction
//!
//! A `case-file` element becomes a [`CaseRecord`] only when it is on the
//! principal register and carries every block the record is built from.
//! Elements missing a block are expected noise in the annual files and are
//! dropped without error. Once an element passes that check, any required
//! field that fails to parse is an error for the whole archive.

use chrono::NaiveDate;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;
use tmha_common::types::parse_archive_date;
use tmha_common::{ArchiveBatch, CaseRecord, HOME_COUNTRY};
use tracing::{debug, info, trace};

use crate::classification;
use crate::cursor::{self, XmlElement};
use crate::error::{IngestError, Result};
use crate::workspace::Workspace;

pub const HEADER: &str = "case-file-header";
pub const OWNERS: &str = "case-file-owners";
pub const OWNER: &str = "case-file-owner";
pub const SERIAL_NUMBER: &str = "serial-number";
pub const REGISTRATION_NUMBER: &str = "registration-number";
pub const STATEMENTS: &str = "case-file-statements";
pub const STATEMENT: &str = "case-file-statement";
pub const CLASSIFICATIONS: &str = "classifications";
pub const CLASSIFICATION: &str = "classification";

/// Header flag marking supplemental-register filings
pub const SUPPLEMENTAL_REGISTER: &str = "supplemental-register-in";

/// Flag value for "not supplemental", i.e. principal register
pub const PRINCIPAL_REGISTER_FLAG: &str = "F";

/// Statement type-code prefix for goods and services text
pub const GOODS_AND_SERVICES_PREFIX: &str = "GS";

/// True when `element` is a principal-register case file with every
/// required block present
pub fn is_eligible(element: &XmlElement) -> bool {
    let Some(header) = element.child(HEADER) else {
        return false;
    };

    header.child_text(SUPPLEMENTAL_REGISTER).map(str::trim) == Some(PRINCIPAL_REGISTER_FLAG)
        && element
            .child(OWNERS)
            .and_then(|owners| owners.child(OWNER))
            .is_some()
        && element.child(SERIAL_NUMBER).is_some()
        && element.child(STATEMENTS).is_some()
        && element.child(CLASSIFICATIONS).is_some()
}

/// Map one element to a record, `Ok(None)` when it is not eligible
pub fn try_extract(element: &XmlElement) -> Result<Option<CaseRecord>> {
    if !is_eligible(element) {
        return Ok(None);
    }

    // Presence of every block below was checked by is_eligible.
    let (Some(header), Some(owner)) = (
        element.child(HEADER),
        element.child(OWNERS).and_then(|o| o.child(OWNER)),
    ) else {
        return Ok(None);
    };

    let (state, country) = owner_jurisdiction(owner);

    let goods = goods_and_services(element);
    let classifications = classification::assemble(
        element
            .child(CLASSIFICATIONS)
            .into_iter()
            .flat_map(|c| c.children(CLASSIFICATION)),
        &goods,
    );

    Ok(Some(CaseRecord {
        filing_date: required_date(header, "filing-date")?,
        serial_number: required_int(element, SERIAL_NUMBER)?,
        registration_date: optional_date(header, "registration-date")?,
        registration_number: optional_int(element, REGISTRATION_NUMBER)?,
        owner: required_text(owner, "party-name")?.to_string(),
        owner_type_id: required_int(owner, "legal-entity-type-code")?,
        state,
        country,
        attorney: optional_text(header, "attorney-name"),
        status_code: required_int(header, "status-code")?,
        mark_literal_elements: optional_text(header, "mark-identification"),
        classifications,
    }))
}

/// Extract every eligible record from a stream of elements, preserving order
pub fn extract_records<I>(elements: I) -> Result<ArchiveBatch>
where
    I: IntoIterator<Item = Result<XmlElement>>,
{
    let mut batch = ArchiveBatch::new();
    let mut dropped = 0usize;

    for element in elements {
        match try_extract(&element?)? {
            Some(record) => batch.push(record),
            None => {
                dropped += 1;
                trace!("Dropped ineligible case-file element");
            }
        }
    }

    debug!(records = batch.len(), dropped, "Extracted case files");
    Ok(batch)
}

/// Parse an already-decompressed archive document
pub fn parse_xml_file(path: &Path, record_element: &str) -> Result<ArchiveBatch> {
    extract_records(cursor::elements(path, record_element)?)
}

/// Extract `archive` into `workspace`, parse it, and release the temp file
pub fn parse_archive(workspace: &Workspace, archive: &Path, record_element: &str) -> Result<ArchiveBatch> {
    let started = Instant::now();
    info!(archive = %archive.display(), "Parsing archive");

    let extracted = workspace.extract(archive)?;
    let parsed = parse_xml_file(extracted.path(), record_element);
    let released = extracted.release();

    let batch = parsed?;
    released?;

    info!(
        archive = %archive.display(),
        records = batch.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Parsed archive"
    );

    Ok(batch)
}

/// State wins over country; with neither, the home country stands.
fn owner_jurisdiction(owner: &XmlElement) -> (Option<String>, String) {
    let nationality = owner.child("nationality");

    if let Some(state) = nationality
        .and_then(|n| n.child_text("state"))
        .filter(|s| !s.trim().is_empty())
    {
        return (Some(state.to_string()), HOME_COUNTRY.to_string());
    }

    let country = nationality
        .and_then(|n| n.child_text("country"))
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(HOME_COUNTRY);

    (None, country.to_string())
}

/// Texts of statements whose type code marks goods and services, in order.
/// A statement with no text still occupies its position.
fn goods_and_services(element: &XmlElement) -> Vec<Option<String>> {
    element
        .child(STATEMENTS)
        .into_iter()
        .flat_map(|s| s.children(STATEMENT))
        .filter(|s| {
            s.child_text("type-code")
                .is_some_and(|code| code.trim().starts_with(GOODS_AND_SERVICES_PREFIX))
        })
        .map(|s| s.child_text("text").map(str::to_string))
        .collect()
}

fn required_text<'a>(parent: &'a XmlElement, field: &'static str) -> Result<&'a str> {
    parent
        .child_text(field)
        .ok_or_else(|| IngestError::field(field, "", "required element missing"))
}

fn optional_text(parent: &XmlElement, field: &str) -> Option<String> {
    parent.child_text(field).map(str::to_string)
}

/// Optional fields count as absent when their element is empty
fn present<'a>(parent: &'a XmlElement, field: &str) -> Option<&'a str> {
    parent.child_text(field).filter(|raw| !raw.trim().is_empty())
}

fn parse_int<T>(field: &'static str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| IngestError::field(field, raw, e))
}

fn required_int<T>(parent: &XmlElement, field: &'static str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    parse_int(field, required_text(parent, field)?)
}

fn optional_int<T>(parent: &XmlElement, field: &'static str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    present(parent, field)
        .map(|raw| parse_int(field, raw))
        .transpose()
}

fn required_date(header: &XmlElement, field: &'static str) -> Result<NaiveDate> {
    let raw = required_text(header, field)?;
    parse_archive_date(raw).map_err(|e| IngestError::field(field, raw, e))
}

fn optional_date(header: &XmlElement, field: &'static str) -> Result<Option<NaiveDate>> {
    present(header, field)
        .map(|raw| parse_archive_date(raw).map_err(|e| IngestError::field(field, raw, e)))
        .transpose()
}
