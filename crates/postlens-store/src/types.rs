//! Filter and statistics types for the post store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use postlens_core::Sentiment;

/// Filter vocabulary for querying the posts collection.
///
/// Mirrors the query parameters of the data/export endpoints: every field is
/// optional and absent fields do not constrain the result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_media: Option<bool>,
    /// Case-insensitive substring match over raw and cleaned text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
}

impl PostFilter {
    /// Filter matching every post.
    pub fn all() -> Self {
        Self::default()
    }

    /// Drop pagination for full-slice passes (exports, aggregations).
    pub fn unpaged(mut self) -> Self {
        self.limit = None;
        self.skip = None;
        self
    }
}

/// Store-level statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_posts: i64,
    pub enriched_posts: i64,
    pub posts_with_media: i64,
    pub total_uploads: i64,
    pub db_path: String,
    pub db_size_mb: f64,
}
