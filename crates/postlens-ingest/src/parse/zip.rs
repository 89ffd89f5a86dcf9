//! ZIP bundle parser.
//!
//! The archive is unpacked into the batch's upload directory so media
//! entries stay addressable by path after ingestion. Every extracted
//! `.json`/`.csv` entry is parsed in discovery order; a bad inner data file
//! is skipped so its siblings still contribute records.

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::warn;

use postlens_core::{Error, RawRecord, Result};

use super::FileKind;

/// Parse a ZIP bundle, extracting its contents under `extract_dir`.
pub fn parse(filename: &str, bytes: &[u8], extract_dir: &Path) -> Result<Vec<RawRecord>> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|e| Error::parse(filename, format!("invalid ZIP archive: {}", e)))?;

    // Extract everything first; data files are parsed afterwards so media
    // files referenced by records are already on disk.
    let mut data_files: Vec<PathBuf> = Vec::new();
    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(e) => e,
            Err(e) => {
                warn!("Unreadable entry {} in {}: {}", i, filename, e);
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }

        let rel = match entry.enclosed_name() {
            Some(p) => p.to_path_buf(),
            None => {
                warn!("Skipping entry with unsafe path in {}: {}", filename, entry.name());
                continue;
            }
        };

        let dest = extract_dir.join(&rel);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut data = Vec::new();
        if let Err(e) = entry.read_to_end(&mut data) {
            warn!("Failed to read entry {} in {}: {}", entry.name(), filename, e);
            continue;
        }
        std::fs::write(&dest, &data)?;

        let name = rel.to_string_lossy().to_string();
        match FileKind::from_name(&name) {
            Some(FileKind::Json) | Some(FileKind::Csv) => data_files.push(dest),
            _ => {} // media and other entries stay on disk, unparsed
        }
    }

    let mut records = Vec::new();
    for path in &data_files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("entry")
            .to_string();
        let data = std::fs::read(path)?;

        let parsed = match FileKind::from_name(&name) {
            Some(FileKind::Json) => super::json::parse(&name, &data),
            Some(FileKind::Csv) => super::csv::parse(&name, &data),
            _ => continue,
        };
        match parsed {
            Ok(mut entry_records) => records.append(&mut entry_records),
            Err(e) => {
                warn!("Skipping unparseable entry in {}: {}", filename, e);
            }
        }
    }
    Ok(records)
}
