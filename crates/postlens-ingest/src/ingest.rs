//! Ingestion coordinator: save raw file → parse → normalize → persist.
//!
//! The coordinator covers only the synchronous half of an upload; the
//! returned outcome is what the caller hands to the enrichment queue.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::normalize::normalize;
use crate::parse::{self, FileKind};
use postlens_core::{Error, Post, Result, UploadBatch};
use postlens_store::PostStore;

/// Result of the synchronous ingestion path.
pub struct IngestOutcome {
    pub batch: UploadBatch,
    /// Accepted, un-enriched posts — the snapshot handed to enrichment.
    pub posts: Vec<Post>,
}

/// Orchestrates upload handling up to the enrichment handoff.
pub struct IngestCoordinator<'a> {
    store: &'a PostStore,
    uploads_dir: &'a Path,
}

impl<'a> IngestCoordinator<'a> {
    pub fn new(store: &'a PostStore, uploads_dir: &'a Path) -> Self {
        Self { store, uploads_dir }
    }

    /// Ingest one uploaded file.
    ///
    /// Fails with `UnsupportedFormat` before any I/O for an unknown
    /// extension and with `Parse` (nothing persisted to the store) for a
    /// malformed container. Zero accepted posts is a valid empty upload.
    pub fn ingest(&self, filename: &str, bytes: &[u8]) -> Result<IngestOutcome> {
        let safe_name = sanitize_filename(filename);
        let kind = FileKind::from_name(&safe_name).ok_or_else(|| {
            Error::UnsupportedFormat(format!(
                "{} (allowed: .json, .csv, .zip)",
                filename
            ))
        })?;

        let mut batch = UploadBatch::new(safe_name.clone(), 0, content_hash(bytes));

        // Raw file lives in a directory namespaced by the batch id, so
        // concurrent uploads of the same filename never collide.
        let upload_dir = self.uploads_dir.join(&batch.file_id);
        std::fs::create_dir_all(&upload_dir)?;
        std::fs::write(upload_dir.join(&safe_name), bytes)?;

        let records = parse::parse_records(kind, &safe_name, bytes, &upload_dir)?;
        let record_count = records.len();

        let posts: Vec<Post> = records.into_iter().filter_map(normalize).collect();
        if posts.len() < record_count {
            debug!(
                "{}: rejected {} of {} records during normalization",
                safe_name,
                record_count - posts.len(),
                record_count
            );
        }

        batch.total_posts = posts.len();
        self.store.insert_upload(&batch)?;
        if !posts.is_empty() {
            self.store.insert_posts(&batch.file_id, &posts)?;
        }

        info!(
            "Ingested {} as batch {}: {} posts accepted",
            safe_name,
            batch.file_id,
            posts.len()
        );

        Ok(IngestOutcome { batch, posts })
    }
}

/// Compute the SHA-256 hash of the raw upload bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Sanitize a filename to prevent path traversal.
fn sanitize_filename(name: &str) -> String {
    let name = name.replace('/', "").replace('\\', "").replace("..", "");

    Path::new(&name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use postlens_core::UploadStatus;
    use postlens_store::PostFilter;
    use tempfile::TempDir;

    fn setup() -> (PostStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = PostStore::open(dir.path().join("db")).unwrap();
        (store, dir)
    }

    #[test]
    fn test_ingest_json_upload_end_to_end() {
        let (store, dir) = setup();
        let uploads = dir.path().join("uploads");
        let coordinator = IngestCoordinator::new(&store, &uploads);

        let data = br#"{"posts": [
            {"id": "1", "text": "I love this #great day!", "platform": "twitter"},
            {"id": "2", "raw_text": "", "likes": 1}
        ]}"#;
        let outcome = coordinator.ingest("export.json", data).unwrap();

        assert_eq!(outcome.batch.total_posts, 1);
        assert_eq!(outcome.batch.status, UploadStatus::Uploaded);
        assert_eq!(outcome.posts[0].post_id, "1");

        // Batch and posts are persisted; the raw file is on disk.
        let stored = store.get_upload(&outcome.batch.file_id).unwrap().unwrap();
        assert_eq!(stored.total_posts, 1);
        assert!(store.get_post("1").unwrap().is_some());
        assert!(uploads
            .join(&outcome.batch.file_id)
            .join("export.json")
            .exists());
    }

    #[test]
    fn test_unsupported_extension_rejected_before_io() {
        let (store, dir) = setup();
        let uploads = dir.path().join("uploads");
        let coordinator = IngestCoordinator::new(&store, &uploads);

        let result = coordinator.ingest("export.xml", b"<posts/>");
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
        assert!(!uploads.exists());
    }

    #[test]
    fn test_parse_failure_persists_nothing() {
        let (store, dir) = setup();
        let uploads_dir = dir.path().join("uploads");
        let coordinator = IngestCoordinator::new(&store, &uploads_dir);

        let result = coordinator.ingest("bad.json", br#"{"no_posts_here": true}"#);
        assert!(matches!(result, Err(Error::Parse { .. })));
        assert!(store.list_uploads().unwrap().is_empty());
        assert_eq!(store.count_posts(&PostFilter::all()).unwrap(), 0);
    }

    #[test]
    fn test_empty_upload_is_not_an_error() {
        let (store, dir) = setup();
        let uploads_dir = dir.path().join("uploads");
        let coordinator = IngestCoordinator::new(&store, &uploads_dir);

        let outcome = coordinator.ingest("empty.json", b"[]").unwrap();
        assert_eq!(outcome.batch.total_posts, 0);
        assert!(outcome.posts.is_empty());
        assert!(store.get_upload(&outcome.batch.file_id).unwrap().is_some());
    }

    #[test]
    fn test_csv_row_without_id_gets_generated_one() {
        let (store, dir) = setup();
        let uploads_dir = dir.path().join("uploads");
        let coordinator = IngestCoordinator::new(&store, &uploads_dir);

        let outcome = coordinator
            .ingest("posts.csv", b"platform,content\ntwitter,hello from csv\n")
            .unwrap();
        assert_eq!(outcome.posts.len(), 1);
        assert!(!outcome.posts[0].post_id.is_empty());
        assert_eq!(outcome.posts[0].platform, "twitter");
    }
}
