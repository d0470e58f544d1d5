//! Archive validation stage (spec §4.6 step 3): ZIP integrity test,
//! extraction (reusing an existing directory), and required-file check.
//!
//! Grounded on `col_importer.py::parse_file`/`_validate_coldp_structure`.

use crate::error::{ImporterError, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

const REQUIRED_FILES: &[&str] = &["metadata.yaml", "NameUsage.tsv"];

/// Runs zip's own CRC integrity check over every entry in the archive.
pub fn test_integrity(file_path: &Path) -> Result<()> {
    let file = File::open(file_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        std::io::copy(&mut entry, &mut std::io::sink())?;
    }
    Ok(())
}

pub fn derive_extract_path(file_path: &Path) -> PathBuf {
    let mut s = file_path.to_string_lossy().into_owned();
    if let Some(stripped) = s.strip_suffix(".zip") {
        s = stripped.to_string();
    }
    PathBuf::from(format!("{s}_extracted"))
}

/// Extracts `file_path` into `extract_path`, reusing it if it already exists.
pub fn extract(file_path: &Path, extract_path: &Path) -> Result<()> {
    if extract_path.exists() {
        tracing::info!(path = %extract_path.display(), "reusing existing extraction");
        return Ok(());
    }

    let file = File::open(file_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    tracing::info!(entries = archive.len(), "extracting archive");
    std::fs::create_dir_all(extract_path)?;
    archive.extract(extract_path)?;
    Ok(())
}

pub fn validate_coldp_structure(extract_path: &Path) -> Result<()> {
    for filename in REQUIRED_FILES {
        if !extract_path.join(filename).exists() {
            return Err(ImporterError::InvalidArchive(format!("missing required ColDP file: {filename}")));
        }
    }
    Ok(())
}
