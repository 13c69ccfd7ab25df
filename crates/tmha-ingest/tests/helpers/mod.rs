//! Test fixtures for archive ingestion tests
//!
//! `CaseFileFixture` renders one `case-file` element; `write_archive` wraps
//! a list of them in a document and zips it the way the annual files ship.

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tmha_ingest::{IngestConfig, IngestScheduler, Workspace};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

// ============================================================================
// Case-file Fixtures
// ============================================================================

/// Builder for one `case-file` element with fluent API
#[derive(Debug, Clone)]
pub struct CaseFileFixture {
    serial_number: Option<String>,
    registration_number: Option<String>,
    filing_date: String,
    registration_date: Option<String>,
    status_code: String,
    supplemental: bool,
    attorney: Option<String>,
    mark: Option<String>,
    owner_name: String,
    entity_type: String,
    state: Option<String>,
    country: Option<String>,
    statements: Vec<(String, String)>,
    codes: Vec<String>,
    header: bool,
    owner: bool,
    statement_block: bool,
    classification_block: bool,
}

impl CaseFileFixture {
    /// Principal-register case file with every required block
    pub fn new(serial_number: i64) -> Self {
        Self {
            serial_number: Some(serial_number.to_string()),
            registration_number: None,
            filing_date: "20150106".to_string(),
            registration_date: None,
            status_code: "630".to_string(),
            supplemental: false,
            attorney: None,
            mark: None,
            owner_name: format!("Owner of {serial_number}"),
            entity_type: "03".to_string(),
            state: None,
            country: None,
            statements: Vec::new(),
            codes: Vec::new(),
            header: true,
            owner: true,
            statement_block: true,
            classification_block: true,
        }
    }

    /// Add a goods-and-services statement and its matching class code
    pub fn with_goods(mut self, code: &str, text: &str) -> Self {
        self.statements.push(("GS0001".to_string(), text.to_string()));
        self.codes.push(code.to_string());
        self
    }

    /// Add a statement of any type
    pub fn with_statement(mut self, type_code: &str, text: &str) -> Self {
        self.statements.push((type_code.to_string(), text.to_string()));
        self
    }

    /// Add a classification without a statement
    pub fn with_code(mut self, code: &str) -> Self {
        self.codes.push(code.to_string());
        self
    }

    pub fn with_registration(mut self, number: i64, date: &str) -> Self {
        self.registration_number = Some(number.to_string());
        self.registration_date = Some(date.to_string());
        self
    }

    pub fn with_owner(mut self, name: &str) -> Self {
        self.owner_name = name.to_string();
        self
    }

    pub fn with_state(mut self, state: &str) -> Self {
        self.state = Some(state.to_string());
        self
    }

    pub fn with_country(mut self, country: &str) -> Self {
        self.country = Some(country.to_string());
        self
    }

    pub fn with_attorney(mut self, attorney: &str) -> Self {
        self.attorney = Some(attorney.to_string());
        self
    }

    pub fn with_mark(mut self, mark: &str) -> Self {
        self.mark = Some(mark.to_string());
        self
    }

    /// Replace the serial number with raw text, e.g. a malformed value
    pub fn with_raw_serial(mut self, raw: &str) -> Self {
        self.serial_number = Some(raw.to_string());
        self
    }

    pub fn supplemental(mut self) -> Self {
        self.supplemental = true;
        self
    }

    pub fn without_header(mut self) -> Self {
        self.header = false;
        self
    }

    pub fn without_owner(mut self) -> Self {
        self.owner = false;
        self
    }

    pub fn without_serial(mut self) -> Self {
        self.serial_number = None;
        self
    }

    pub fn without_statements(mut self) -> Self {
        self.statement_block = false;
        self
    }

    pub fn without_classifications(mut self) -> Self {
        self.classification_block = false;
        self
    }

    /// Whether the pipeline should keep this case file
    pub fn is_eligible(&self) -> bool {
        self.header
            && !self.supplemental
            && self.owner
            && self.serial_number.is_some()
            && self.statement_block
            && self.classification_block
    }

    /// Render the `case-file` element
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<case-file>\n");

        if let Some(serial) = &self.serial_number {
            xml.push_str(&leaf("serial-number", serial));
        }
        if let Some(number) = &self.registration_number {
            xml.push_str(&leaf("registration-number", number));
        }

        if self.header {
            xml.push_str("<case-file-header>\n");
            xml.push_str(&leaf("filing-date", &self.filing_date));
            if let Some(date) = &self.registration_date {
                xml.push_str(&leaf("registration-date", date));
            }
            xml.push_str(&leaf("status-code", &self.status_code));
            if let Some(mark) = &self.mark {
                xml.push_str(&leaf("mark-identification", mark));
            }
            if let Some(attorney) = &self.attorney {
                xml.push_str(&leaf("attorney-name", attorney));
            }
            xml.push_str(&leaf(
                "supplemental-register-in",
                if self.supplemental { "T" } else { "F" },
            ));
            xml.push_str("</case-file-header>\n");
        }

        if self.statement_block {
            xml.push_str("<case-file-statements>\n");
            for (type_code, text) in &self.statements {
                xml.push_str("<case-file-statement>\n");
                xml.push_str(&leaf("type-code", type_code));
                xml.push_str(&leaf("text", text));
                xml.push_str("</case-file-statement>\n");
            }
            xml.push_str("</case-file-statements>\n");
        }

        if self.owner {
            xml.push_str("<case-file-owners>\n<case-file-owner>\n");
            xml.push_str(&leaf("party-name", &self.owner_name));
            xml.push_str(&leaf("legal-entity-type-code", &self.entity_type));
            if self.state.is_some() || self.country.is_some() {
                xml.push_str("<nationality>\n");
                if let Some(state) = &self.state {
                    xml.push_str(&leaf("state", state));
                }
                if let Some(country) = &self.country {
                    xml.push_str(&leaf("country", country));
                }
                xml.push_str("</nationality>\n");
            }
            xml.push_str("</case-file-owner>\n</case-file-owners>\n");
        }

        if self.classification_block {
            xml.push_str("<classifications>\n");
            for code in &self.codes {
                xml.push_str("<classification>\n");
                xml.push_str(&leaf("international-code", code));
                xml.push_str("</classification>\n");
            }
            xml.push_str("</classifications>\n");
        }

        xml.push_str("</case-file>\n");
        xml
    }
}

fn leaf(name: &str, text: &str) -> String {
    format!("<{name}>{}</{name}>\n", escape(text))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ============================================================================
// Archive Fixtures
// ============================================================================

/// Wrap case files in a full annual-file document
pub fn render_document(case_files: &[CaseFileFixture]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!DOCTYPE trademark-applications-daily SYSTEM \"trademark-applications-daily-v2.dtd\">\n\
         <trademark-applications-daily>\n\
         <version><version-no>2.0</version-no></version>\n\
         <!-- annual backfile -->\n\
         <application-information>\n<file-segments>\n<action-keys>\n",
    );
    for case_file in case_files {
        xml.push_str(&case_file.to_xml());
    }
    xml.push_str("</action-keys>\n</file-segments>\n</application-information>\n</trademark-applications-daily>\n");
    xml
}

/// Write a zip holding `entries` in order
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
    let file = File::create(path).expect("create zip");
    let mut writer = ZipWriter::new(file);
    for (name, data) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(data).expect("write zip entry");
    }
    writer.finish().expect("finish zip");
    path.to_path_buf()
}

/// Zip the rendered document as `<name>.zip` in `dir`
pub fn write_archive(dir: &Path, name: &str, case_files: &[CaseFileFixture]) -> PathBuf {
    let document = render_document(case_files);
    let entry = format!("{name}.xml");
    write_zip(
        &dir.join(format!("{name}.zip")),
        &[(entry.as_str(), document.as_bytes())],
    )
}

/// `count` eligible case files with two classes each, plus one of each
/// ineligible shape
pub fn mixed_case_files(count: usize) -> Vec<CaseFileFixture> {
    let mut case_files: Vec<CaseFileFixture> = (0..count)
        .map(|i| {
            CaseFileFixture::new(86_000_000 + i as i64)
                .with_goods("009", "downloadable software")
                .with_statement("D10000", "standard characters")
                .with_goods("042", "software as a service")
        })
        .collect();

    case_files.push(CaseFileFixture::new(1).supplemental());
    case_files.push(CaseFileFixture::new(2).without_header());
    case_files.push(CaseFileFixture::new(3).without_owner());
    case_files.push(CaseFileFixture::new(4).without_serial());
    case_files.push(CaseFileFixture::new(5).without_statements());
    case_files.push(CaseFileFixture::new(6).without_classifications());
    case_files
}

// ============================================================================
// Environment
// ============================================================================

/// Temp directory holding archives, a scratch workspace and a database
pub struct TestEnv {
    pub dir: TempDir,
    pub workspace: Arc<Workspace>,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let workspace =
            Arc::new(Workspace::prepare(dir.path().join("scratch")).expect("prepare workspace"));
        Self { dir, workspace }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn database_path(&self) -> PathBuf {
        self.dir.path().join("cases.db")
    }

    pub fn scheduler(&self, concurrency: usize) -> IngestScheduler {
        IngestScheduler::new(
            Arc::clone(&self.workspace),
            IngestConfig::new()
                .with_scratch_dir(self.workspace.root())
                .with_concurrency(concurrency),
        )
    }

    /// Files left behind in the scratch directory
    pub fn residual_files(&self) -> Vec<PathBuf> {
        self.workspace.residual_files().expect("list scratch dir")
    }
}
