//! JSON export parser.

use serde_json::Value;
use tracing::debug;

use postlens_core::{Error, RawRecord, Result};

/// Parse a JSON export: either a top-level array of records or an object
/// with a `posts` array. Any other root shape aborts the file.
pub fn parse(filename: &str, bytes: &[u8]) -> Result<Vec<RawRecord>> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| Error::parse(filename, e.to_string()))?;

    let entries = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("posts") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(Error::parse(
                    filename,
                    "expected an array of posts or an object with a 'posts' array",
                ))
            }
        },
        _ => {
            return Err(Error::parse(
                filename,
                "expected an array of posts or an object with a 'posts' array",
            ))
        }
    };

    let mut records = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            Value::Object(map) => records.push(map),
            other => {
                // A bad entry drops only itself, not the file.
                debug!("Skipping non-object entry in {}: {}", filename, other);
            }
        }
    }
    Ok(records)
}
