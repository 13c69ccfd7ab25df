//! Locating archives under a source path

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

const ARCHIVE_EXTENSION: &str = "zip";

/// A file path is returned as is. A directory yields its top-level `.zip`
/// files (extension matched case-insensitively), sorted by path.
pub fn discover_archives(source: &Path) -> Result<Vec<PathBuf>> {
    if fs::metadata(source)?.is_file() {
        return Ok(vec![source.to_path_buf()]);
    }

    let mut archives = Vec::new();
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && is_archive(&path) {
            archives.push(path);
        }
    }

    archives.sort();
    Ok(archives)
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}
