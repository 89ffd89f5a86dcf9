//! CSV export parser.
//!
//! The first line is the header; every following row becomes one record
//! keyed by header position. Rows with a column-count mismatch get a
//! best-effort partial mapping and row-level errors skip only that row:
//! acceptance is the normalizer's call, not the parser's.

use csv::ReaderBuilder;
use serde_json::Value;
use tracing::warn;

use postlens_core::{RawRecord, Result};

/// Parse a CSV export into header-keyed records.
pub fn parse(filename: &str, bytes: &[u8]) -> Result<Vec<RawRecord>> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(bytes);

    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(e) => {
            warn!("Unreadable CSV header in {}: {}", filename, e);
            return Ok(Vec::new());
        }
    };

    let mut records = Vec::new();
    for row in reader.records() {
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping malformed CSV row in {}: {}", filename, e);
                continue;
            }
        };
        if row.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        // zip() pairs up to the shorter side: missing trailing columns are
        // simply absent, surplus fields have no header to land under.
        let mut record = RawRecord::new();
        for (key, value) in headers.iter().zip(row.iter()) {
            record.insert(key.to_string(), Value::String(value.to_string()));
        }
        if !record.is_empty() {
            records.push(record);
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_keyed_rows() {
        let data = b"platform,content\ntwitter,hello world\ninstagram,nice photo\n";
        let records = parse("posts.csv", data).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["platform"], "twitter");
        assert_eq!(records[1]["content"], "nice photo");
    }

    #[test]
    fn test_short_row_maps_partially() {
        let data = b"platform,content,user_id\ntwitter,hello\n";
        let records = parse("posts.csv", data).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["platform"], "twitter");
        assert_eq!(records[0]["content"], "hello");
        assert!(!records[0].contains_key("user_id"));
    }

    #[test]
    fn test_long_row_drops_surplus_fields() {
        let data = b"platform,content\ntwitter,hello,extra,fields\n";
        let records = parse("posts.csv", data).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].len(), 2);
    }

    #[test]
    fn test_blank_rows_are_skipped() {
        let data = b"platform,content\n,\ntwitter,hi\n";
        let records = parse("posts.csv", data).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_garbage_input_never_errors() {
        // Binary junk may yield zero or nonsense records, never an error.
        assert!(parse("junk.csv", &[0xff, 0xfe, 0x00, 0x01]).is_ok());
    }
}
