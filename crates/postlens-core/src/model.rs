//! Canonical post model shared by every pipeline stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One loosely-typed record as produced by a format parser, prior to
/// normalization. Keys are whatever the source export used; values are
/// arbitrary JSON. Not persisted.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Sentiment label assigned by text enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }
}

/// A media attachment on a post.
///
/// `media_type` stays a free-form string: exports disagree on the
/// vocabulary and an unrecognized kind must not drop the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
}

impl MediaItem {
    /// An image item with just a URL, as produced for bare-string media.
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            media_type: "image".to_string(),
            url: url.into(),
            filename: String::new(),
            tags: Vec::new(),
            caption: None,
            similarity_score: None,
        }
    }

    pub fn is_image(&self) -> bool {
        self.media_type == "image"
    }
}

/// A normalized social-media post.
///
/// Created un-enriched by the normalizer; the enrichment worker later fills
/// `cleaned_text`, `language`, `entities`, `sentiment` and
/// `sentiment_confidence` in place, keyed by `post_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub platform: String,
    pub post_id: String,
    pub raw_text: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_confidence: Option<f64>,
}

impl Post {
    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }

    pub fn is_enriched(&self) -> bool {
        self.cleaned_text.is_some()
    }
}

/// Processing status of one upload batch. Transitions are monotonic:
/// `uploaded → processing → completed | error`, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploaded,
    Processing,
    Completed,
    Error,
}

impl UploadStatus {
    /// Ordering rank used to enforce monotonic transitions.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Uploaded => 0,
            Self::Processing => 1,
            Self::Completed | Self::Error => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploaded" => Some(Self::Uploaded),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Metadata for one uploaded file and the batch of posts it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadBatch {
    pub file_id: String,
    pub filename: String,
    pub upload_time: DateTime<Utc>,
    pub total_posts: usize,
    pub status: UploadStatus,
    /// SHA-256 of the raw upload bytes.
    pub content_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadBatch {
    /// Create a batch record for a freshly saved upload.
    pub fn new(filename: impl Into<String>, total_posts: usize, content_hash: String) -> Self {
        Self {
            file_id: uuid::Uuid::new_v4().to_string(),
            filename: filename.into(),
            upload_time: Utc::now(),
            total_posts,
            status: UploadStatus::Uploaded,
            content_hash,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_rank_is_monotonic() {
        assert!(UploadStatus::Uploaded.rank() < UploadStatus::Processing.rank());
        assert!(UploadStatus::Processing.rank() < UploadStatus::Completed.rank());
        // Terminal states share a rank so neither overwrites the other.
        assert_eq!(UploadStatus::Completed.rank(), UploadStatus::Error.rank());
    }

    #[test]
    fn test_media_item_serde_uses_type_key() {
        let item = MediaItem::image("http://example.com/a.jpg");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["url"], "http://example.com/a.jpg");
        assert!(json.get("caption").is_none());
    }

    #[test]
    fn test_sentiment_round_trip() {
        for s in [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral] {
            assert_eq!(Sentiment::parse(s.as_str()), Some(s));
        }
        assert_eq!(Sentiment::parse("angry"), None);
    }
}
