//! Format parsers: raw upload bytes → sequences of loosely-typed records.

pub mod csv;
pub mod json;
pub mod zip;

use std::path::Path;

use postlens_core::{RawRecord, Result};

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Json,
    Csv,
    Zip,
}

impl FileKind {
    /// Detect the format from a filename extension.
    pub fn from_name(filename: &str) -> Option<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())?
            .to_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }
}

/// Parse raw bytes according to the declared kind.
///
/// `extract_dir` is the per-upload directory ZIP contents are unpacked
/// into; JSON and CSV ignore it. Records come back in source order.
pub fn parse_records(
    kind: FileKind,
    filename: &str,
    bytes: &[u8],
    extract_dir: &Path,
) -> Result<Vec<RawRecord>> {
    match kind {
        FileKind::Json => json::parse(filename, bytes),
        FileKind::Csv => csv::parse(filename, bytes),
        FileKind::Zip => zip::parse(filename, bytes, extract_dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_from_name() {
        assert_eq!(FileKind::from_name("export.json"), Some(FileKind::Json));
        assert_eq!(FileKind::from_name("Posts.CSV"), Some(FileKind::Csv));
        assert_eq!(FileKind::from_name("archive.zip"), Some(FileKind::Zip));
        assert_eq!(FileKind::from_name("notes.txt"), None);
        assert_eq!(FileKind::from_name("no_extension"), None);
    }
}
