//! End-to-end pipeline test: upload bytes → ingest → enrich → query.
//!
//! Drives the same components the server wires together, without HTTP.

use std::sync::Arc;

use postlens_core::{Sentiment, UploadStatus};
use postlens_enrich::{EnrichmentWorker, KeywordTextEnricher, StaticImageEnricher};
use postlens_ingest::IngestCoordinator;
use postlens_store::{PostFilter, PostStore};
use tempfile::TempDir;

fn setup() -> (PostStore, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = PostStore::open(dir.path().join("db")).unwrap();
    (store, dir)
}

#[test]
fn test_upload_to_enriched_corpus() {
    let (store, dir) = setup();
    let uploads = dir.path().join("uploads");

    let data = br#"{"posts": [
        {"id": "1", "text": "I love this #great day!", "platform": "twitter",
         "media": ["http://x/sunny.jpg"]},
        {"id": "2", "content": "terrible service, never again", "platform": "yelp",
         "created_at": "2024-03-05T10:30:00Z"},
        {"id": "3", "raw_text": "", "likes": 9}
    ]}"#;

    // Synchronous half: parse, normalize, persist raw posts.
    let coordinator = IngestCoordinator::new(&store, &uploads);
    let outcome = coordinator.ingest("export.json", data).unwrap();
    assert_eq!(outcome.batch.total_posts, 2); // the empty record is dropped
    assert_eq!(outcome.batch.status, UploadStatus::Uploaded);

    // Async half: the worker consumes the (file_id, posts) snapshot.
    let worker = EnrichmentWorker::new(
        &store,
        Arc::new(KeywordTextEnricher),
        Arc::new(StaticImageEnricher),
    );
    let processed = worker
        .enrich_batch(&outcome.batch.file_id, &outcome.posts)
        .unwrap();
    assert_eq!(processed, 2);

    let batch = store.get_upload(&outcome.batch.file_id).unwrap().unwrap();
    assert_eq!(batch.status, UploadStatus::Completed);

    // The enriched corpus answers the filter vocabulary.
    let positive = store
        .query_posts(&PostFilter {
            sentiment: Some(Sentiment::Positive),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(positive.len(), 1);
    assert_eq!(positive[0].post_id, "1");
    assert_eq!(positive[0].media[0].caption.as_deref(), Some("Image content"));

    let negative = store
        .query_posts(&PostFilter {
            sentiment: Some(Sentiment::Negative),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(negative.len(), 1);
    assert_eq!(negative[0].post_id, "2");
    assert_eq!(negative[0].timestamp.to_rfc3339(), "2024-03-05T10:30:00+00:00");

    let with_media = store
        .query_posts(&PostFilter {
            has_media: Some(true),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(with_media.len(), 1);

    // Aggregations see the enriched fields.
    let summary = store.analytics_summary(&PostFilter::all()).unwrap();
    assert_eq!(summary.total_posts, 2);
    assert_eq!(summary.platforms.get("twitter"), Some(&1));
    assert_eq!(summary.platforms.get("yelp"), Some(&1));
    assert_eq!(summary.sentiments.get("positive"), Some(&1));
    assert_eq!(summary.sentiments.get("negative"), Some(&1));
    assert_eq!(summary.media_types.get("image"), Some(&1));
}

#[test]
fn test_reenrichment_same_file_id_is_safe() {
    let (store, dir) = setup();
    let uploads_dir = dir.path().join("uploads");
    let coordinator = IngestCoordinator::new(&store, &uploads_dir);
    let outcome = coordinator
        .ingest("posts.csv", b"platform,content\ntwitter,what a great day\n")
        .unwrap();

    let worker = EnrichmentWorker::new(
        &store,
        Arc::new(KeywordTextEnricher),
        Arc::new(StaticImageEnricher),
    );
    worker
        .enrich_batch(&outcome.batch.file_id, &outcome.posts)
        .unwrap();
    let first = store.get_posts_for_file(&outcome.batch.file_id).unwrap();

    // Re-invoking with the same file id (at-least-once delivery) changes
    // nothing: per-post updates are idempotent upserts.
    worker
        .enrich_batch(&outcome.batch.file_id, &outcome.posts)
        .unwrap();
    let second = store.get_posts_for_file(&outcome.batch.file_id).unwrap();

    assert_eq!(first.len(), second.len());
    assert_eq!(first[0].cleaned_text, second[0].cleaned_text);
    assert_eq!(first[0].sentiment, second[0].sentiment);
    assert_eq!(first[0].language, second[0].language);
}
