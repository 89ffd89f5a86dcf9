//! API shape tests — validates that response and request bodies keep the
//! field names the frontend and export consumers rely on.
//!
//! These tests serialize the real wire types (no HTTP server needed) and
//! assert on the JSON field names and kinds.

use chrono::{TimeZone, Utc};
use postlens_core::{MediaItem, Post, Sentiment, UploadBatch, UploadStatus};
use postlens_store::PostFilter;

fn sample_post() -> Post {
    Post {
        platform: "twitter".to_string(),
        post_id: "p1".to_string(),
        raw_text: "I love this #great day!".to_string(),
        timestamp: Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap(),
        user_id: "u1".to_string(),
        media: vec![MediaItem::image("http://x/a.jpg")],
        metadata: Default::default(),
        cleaned_text: None,
        language: None,
        entities: Vec::new(),
        sentiment: None,
        sentiment_confidence: None,
    }
}

/// Verify the upload response shape:
/// { message, file_id, total_posts, processing_status }
#[test]
fn test_upload_response_shape() {
    let response = serde_json::json!({
        "message": "File uploaded successfully",
        "file_id": "a2c0ffee-0000-4000-8000-000000000001",
        "total_posts": 3,
        "processing_status": "processing",
    });

    assert!(response["file_id"].is_string());
    assert!(response["total_posts"].is_number());
    assert_eq!(response["processing_status"], "processing");
}

/// A raw (un-enriched) post serializes without enrichment fields and with
/// the media `type` key the filter/analytics consumers expect.
#[test]
fn test_unenriched_post_shape() {
    let json = serde_json::to_value(sample_post()).unwrap();

    assert_eq!(json["post_id"], "p1");
    assert_eq!(json["platform"], "twitter");
    assert_eq!(json["raw_text"], "I love this #great day!");
    assert!(json["timestamp"].is_string());
    assert_eq!(json["media"][0]["type"], "image");
    assert_eq!(json["media"][0]["url"], "http://x/a.jpg");

    // Enrichment fields are absent until the worker writes them.
    assert!(json.get("cleaned_text").is_none());
    assert!(json.get("language").is_none());
    assert!(json.get("sentiment").is_none());
    assert!(json.get("sentiment_confidence").is_none());
    // The set-like fields serialize as (empty) arrays either way.
    assert!(json["entities"].is_array());
}

/// An enriched post carries the derived fields with lowercase sentiment.
#[test]
fn test_enriched_post_shape() {
    let mut post = sample_post();
    post.cleaned_text = Some("I love this great day!".to_string());
    post.language = Some("en".to_string());
    post.sentiment = Some(Sentiment::Positive);
    post.sentiment_confidence = Some(0.7);
    post.media[0].caption = Some("Image content".to_string());
    post.media[0].tags = vec!["image".to_string()];
    post.media[0].similarity_score = Some(0.5);

    let json = serde_json::to_value(&post).unwrap();
    assert_eq!(json["sentiment"], "positive");
    assert_eq!(json["sentiment_confidence"], 0.7);
    assert_eq!(json["media"][0]["caption"], "Image content");
    assert_eq!(json["media"][0]["similarity_score"], 0.5);
}

/// Batch status serializes lowercase and round-trips.
#[test]
fn test_upload_batch_shape() {
    let batch = UploadBatch::new("export.json", 5, "deadbeef".to_string());
    let json = serde_json::to_value(&batch).unwrap();

    assert!(json["file_id"].is_string());
    assert_eq!(json["filename"], "export.json");
    assert_eq!(json["total_posts"], 5);
    assert_eq!(json["status"], "uploaded");

    let back: UploadBatch = serde_json::from_value(json).unwrap();
    assert_eq!(back.status, UploadStatus::Uploaded);
}

/// The export request's filter block accepts the documented vocabulary.
#[test]
fn test_filter_deserializes_from_export_body() {
    let filter: PostFilter = serde_json::from_value(serde_json::json!({
        "platform": "twitter",
        "sentiment": "negative",
        "language": "en",
        "date_from": "2024-01-01T00:00:00Z",
        "date_to": "2024-12-31T00:00:00Z",
        "has_media": true,
        "search_text": "rust",
    }))
    .unwrap();

    assert_eq!(filter.platform.as_deref(), Some("twitter"));
    assert_eq!(filter.sentiment, Some(Sentiment::Negative));
    assert_eq!(filter.has_media, Some(true));
    assert!(filter.date_from.unwrap() < filter.date_to.unwrap());

    // Unknown sentiment labels are a deserialization error, not a silent
    // no-match filter.
    let bad: Result<PostFilter, _> =
        serde_json::from_value(serde_json::json!({ "sentiment": "angry" }));
    assert!(bad.is_err());
}
