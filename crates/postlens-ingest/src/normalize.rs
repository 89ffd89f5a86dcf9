//! Record normalization: one loosely-typed record → one canonical post.
//!
//! Vendor exports disagree on field names, so every canonical field is
//! resolved through an ordered candidate chain and every chain ends in a
//! total default — except text, where a record with nothing derivable is
//! rejected outright.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde_json::Value;
use tracing::debug;

use postlens_core::{MediaItem, Post, RawRecord};

/// Text candidates, first non-empty wins.
const TEXT_KEYS: [&str; 4] = ["raw_text", "text", "content", "message"];
/// Fields joined with `" | "` when no text candidate is present.
const SUMMARY_KEYS: [&str; 3] = ["title", "description", "caption"];
const TIMESTAMP_KEYS: [&str; 3] = ["timestamp", "created_at", "date"];
const USER_KEYS: [&str; 3] = ["user_id", "author", "username"];
const MEDIA_KEYS: [&str; 3] = ["media", "images", "videos"];

/// Keys absorbed into canonical fields and therefore excluded from
/// metadata. The summary keys are deliberately not listed: they stay in
/// metadata even when used for text synthesis.
const CONSUMED_KEYS: [&str; 16] = [
    "platform", "id", "post_id", "raw_text", "text", "content", "message", "timestamp",
    "created_at", "date", "user_id", "author", "username", "media", "images", "videos",
];

/// Timestamp formats tried in order; first match wins.
const TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%d %H:%M:%S",
];

/// Normalize one raw record into a canonical post, or reject it.
///
/// Rejection happens only when no text is derivable; every other field has
/// an always-succeeding default.
pub fn normalize(record: RawRecord) -> Option<Post> {
    let platform = record
        .get("platform")
        .and_then(value_as_text)
        .filter(|s| !s.trim().is_empty());

    let raw_text = match resolve_text(&record, platform.as_deref()) {
        Some(text) => text,
        None => {
            debug!("Rejecting record with no derivable text content");
            return None;
        }
    };

    let post_id = ["post_id", "id"]
        .iter()
        .find_map(|key| record.get(*key).and_then(value_to_string))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let timestamp = parse_timestamp(
        TIMESTAMP_KEYS
            .iter()
            .find_map(|key| record.get(*key)),
    );

    let user_id = USER_KEYS
        .iter()
        .find_map(|key| record.get(*key).and_then(value_to_string))
        .unwrap_or_default();

    let media = parse_media(MEDIA_KEYS.iter().find_map(|key| record.get(*key)));

    let metadata = record
        .iter()
        .filter(|(key, _)| !CONSUMED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Some(Post {
        platform: platform.unwrap_or_else(|| "unknown".to_string()),
        post_id,
        raw_text,
        timestamp,
        user_id,
        media,
        metadata,
        cleaned_text: None,
        language: None,
        entities: Vec::new(),
        sentiment: None,
        sentiment_confidence: None,
    })
}

/// Resolve post text: explicit candidates, then a title/description/caption
/// summary, then a platform-derived placeholder. `None` means rejection.
fn resolve_text(record: &RawRecord, platform: Option<&str>) -> Option<String> {
    for key in TEXT_KEYS {
        if let Some(text) = record.get(key).and_then(value_as_text) {
            if !text.trim().is_empty() {
                return Some(text);
            }
        }
    }

    let parts: Vec<String> = SUMMARY_KEYS
        .iter()
        .filter_map(|key| record.get(*key).and_then(value_as_text))
        .filter(|s| !s.trim().is_empty())
        .collect();
    if !parts.is_empty() {
        return Some(parts.join(" | "));
    }

    // Last resort needs a platform the record actually named; a record
    // with neither text nor platform has nothing worth keeping.
    platform.map(|p| format!("Post from {} platform", p))
}

/// Parse a timestamp value. Total: anything unparseable or absent yields
/// the current (ingestion) time.
pub fn parse_timestamp(value: Option<&Value>) -> DateTime<Utc> {
    match value {
        Some(Value::String(s)) => parse_timestamp_str(s),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(epoch_to_datetime)
            .unwrap_or_else(Utc::now),
        _ => Utc::now(),
    }
}

/// Parse a timestamp string against the known format list. Total.
pub fn parse_timestamp_str(s: &str) -> DateTime<Utc> {
    let s = s.trim();
    if s.is_empty() {
        return Utc::now();
    }

    for format in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Utc.from_utc_datetime(&dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    }

    Utc::now()
}

/// Exports carry epoch timestamps as seconds or milliseconds; disambiguate
/// by magnitude.
fn epoch_to_datetime(value: i64) -> Option<DateTime<Utc>> {
    if value.abs() >= 1_000_000_000_000 {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

/// Normalize a media value. Total over list-of-object, list-of-string,
/// bare-string and anything else (which becomes an empty list).
pub fn parse_media(value: Option<&Value>) -> Vec<MediaItem> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(media_from_entry).collect(),
        Some(Value::String(url)) => vec![MediaItem::image(url)],
        _ => Vec::new(),
    }
}

fn media_from_entry(entry: &Value) -> Option<MediaItem> {
    match entry {
        Value::Object(map) => Some(MediaItem {
            media_type: map
                .get("type")
                .and_then(value_as_text)
                .unwrap_or_else(|| "image".to_string()),
            url: map
                .get("url")
                .and_then(value_as_text)
                .or_else(|| map.get("src").and_then(value_as_text))
                .unwrap_or_default(),
            filename: map
                .get("filename")
                .and_then(value_as_text)
                .unwrap_or_default(),
            tags: Vec::new(),
            caption: None,
            similarity_score: None,
        }),
        Value::String(url) => Some(MediaItem::image(url)),
        _ => None,
    }
}

/// A value usable as text: strings only.
fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// A value coercible to an identifier string: strings and scalars.
fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
