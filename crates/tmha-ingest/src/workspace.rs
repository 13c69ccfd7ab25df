//! Scratch workspace for archive extraction
//!
//! Archives are inflated into a dedicated directory before streaming, since
//! the XML reader needs a plain file handle. A [`Workspace`] is constructed
//! explicitly and passed to whatever needs it, so tests can point it at a
//! throwaway directory.
//!
//! Every extraction is returned as an [`ExtractedXml`] guard. The guard
//! deletes its file on [`ExtractedXml::release`] or, failing that, on drop,
//! so the directory is clean on both success and error paths.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{IngestError, Result};

/// Process-scoped scratch directory
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    next_id: AtomicU64,
}

impl Workspace {
    /// Create `root` if needed and delete files left over from a previous
    /// run that did not exit cleanly. Safe to call repeatedly.
    pub fn prepare(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let mut purged = 0usize;
        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
                purged += 1;
            }
        }

        debug!(root = %root.display(), purged, "Prepared scratch workspace");

        Ok(Self {
            root,
            next_id: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Inflate the first entry of a zip archive into the workspace.
    ///
    /// The temp name is `<archive stem>-<n>.xml`; `n` is unique per
    /// workspace, so the same archive can be extracted by several workers
    /// at once. Further entries in the archive are ignored.
    pub fn extract(&self, archive: &Path) -> Result<ExtractedXml> {
        let file = File::open(archive).map_err(|e| IngestError::extraction(archive, e.to_string()))?;
        let mut zip = ZipArchive::new(BufReader::new(file))
            .map_err(|e| IngestError::extraction(archive, format!("not a readable zip archive: {}", e)))?;

        if zip.len() == 0 {
            return Err(IngestError::extraction(archive, "archive has no entries"));
        }

        let mut entry = zip
            .by_index(0)
            .map_err(|e| IngestError::extraction(archive, format!("cannot open first entry: {}", e)))?;

        if entry.is_dir() {
            return Err(IngestError::extraction(
                archive,
                format!("first entry '{}' is a directory", entry.name()),
            ));
        }

        let entry_name = entry.name().to_string();
        let path = self.temp_path_for(archive);

        // Guard first so a failed inflate does not leave a partial file behind.
        let extracted = ExtractedXml::new(path);
        let mut out = BufWriter::new(File::create(extracted.path())?);
        let bytes = std::io::copy(&mut entry, &mut out).map_err(|e| {
            IngestError::extraction(archive, format!("failed to inflate '{}': {}", entry_name, e))
        })?;
        out.flush()?;

        debug!(
            archive = %archive.display(),
            entry = %entry_name,
            temp = %extracted.path().display(),
            bytes,
            "Extracted archive entry"
        );

        Ok(extracted)
    }

    /// Files currently present in the workspace
    pub fn residual_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        Ok(files)
    }

    fn temp_path_for(&self, archive: &Path) -> PathBuf {
        let stem = archive
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "archive".to_string());
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.root.join(format!("{}-{}.xml", stem, id))
    }
}

/// Extracted XML document owned by the caller until released
#[derive(Debug)]
pub struct ExtractedXml {
    path: PathBuf,
    released: bool,
}

impl ExtractedXml {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the temp file, reporting any failure
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for ExtractedXml {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(temp = %self.path.display(), error = %e, "Failed to remove temp file");
            }
        }
    }
}
