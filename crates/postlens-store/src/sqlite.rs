//! SQLite-backed post and upload store.
//!
//! The posts collection is keyed by `post_id`; writes are upserts with
//! last-writer-wins semantics so enrichment can update rows in place and
//! re-runs stay idempotent. The uploads collection tracks one batch per
//! ingested file with a monotonic status column.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::info;

use crate::schema::SCHEMA_SQL;
use crate::types::{PostFilter, StoreStats};
use postlens_core::{Error, MediaItem, Post, Result, Sentiment, UploadBatch, UploadStatus};

/// SQLite store for posts and upload batches.
pub struct PostStore {
    pub(crate) conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl PostStore {
    /// Open or create the store.
    ///
    /// `db_dir` is the directory (e.g., `data/db/`). The file will be
    /// `db_dir/postlens.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("postlens.db");

        let conn = Self::create_connection(&db_path)?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        let post_count = store.count_posts(&PostFilter::all())?;
        let upload_count = store.count_uploads()?;
        info!(
            "PostStore initialized: {} posts, {} uploads, path={}",
            post_count,
            upload_count,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(conn)
    }

    // ---------------------------------------------------------------
    // Upload batches
    // ---------------------------------------------------------------

    /// Insert a new upload batch record.
    pub fn insert_upload(&self, batch: &UploadBatch) -> Result<()> {
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO uploads (file_id, filename, upload_time, total_posts, status, content_hash, error) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .execute(params![
            batch.file_id,
            batch.filename,
            batch.upload_time.timestamp_millis(),
            batch.total_posts as i64,
            batch.status.as_str(),
            batch.content_hash,
            batch.error,
        ])
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Get one upload batch by file id.
    pub fn get_upload(&self, file_id: &str) -> Result<Option<UploadBatch>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached("SELECT * FROM uploads WHERE file_id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![file_id], |row| Ok(Self::row_to_upload(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row)
    }

    /// List all upload batches, newest first.
    pub fn list_uploads(&self) -> Result<Vec<UploadBatch>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT * FROM uploads ORDER BY upload_time DESC")
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| Ok(Self::row_to_upload(row)))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Advance an upload's status. Transitions are monotonic: a request to
    /// move to a status of lower or equal rank is ignored and returns false.
    pub fn set_upload_status(
        &self,
        file_id: &str,
        status: UploadStatus,
        error: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn.lock();

        let current: Option<String> = conn
            .prepare_cached("SELECT status FROM uploads WHERE file_id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![file_id], |row| row.get(0))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        let current = match current.as_deref().and_then(UploadStatus::parse) {
            Some(s) => s,
            None => return Err(Error::NotFound(format!("upload {}", file_id))),
        };

        if status.rank() <= current.rank() {
            return Ok(false);
        }

        conn.prepare_cached("UPDATE uploads SET status = ?1, error = ?2 WHERE file_id = ?3")
            .map_err(|e| Error::Database(e.to_string()))?
            .execute(params![status.as_str(), error, file_id])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(true)
    }

    fn count_uploads(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM uploads", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))
    }

    // ---------------------------------------------------------------
    // Posts
    // ---------------------------------------------------------------

    /// Insert a batch of posts in one transaction. Each write is an upsert
    /// keyed by post_id (last writer wins).
    pub fn insert_posts(&self, file_id: &str, posts: &[Post]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(e.to_string()))?;
        for post in posts {
            Self::upsert_post_in(&tx, file_id, post)?;
        }
        tx.commit().map_err(|e| Error::Database(e.to_string()))?;
        Ok(posts.len())
    }

    /// Upsert a single post keyed by post_id. One statement, atomic.
    pub fn upsert_post(&self, file_id: &str, post: &Post) -> Result<()> {
        let conn = self.conn.lock();
        Self::upsert_post_in(&conn, file_id, post)
    }

    fn upsert_post_in(conn: &Connection, file_id: &str, post: &Post) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let media_json = serde_json::to_string(&post.media)?;
        let entities_json = serde_json::to_string(&post.entities)?;
        let metadata_json = serde_json::to_string(&post.metadata)?;

        conn.prepare_cached(
            "INSERT INTO posts (post_id, file_id, platform, raw_text, cleaned_text, language, \
             timestamp, user_id, sentiment, sentiment_confidence, media_json, entities_json, \
             metadata_json, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14) \
             ON CONFLICT(post_id) DO UPDATE SET \
                 file_id = excluded.file_id, \
                 platform = excluded.platform, \
                 raw_text = excluded.raw_text, \
                 cleaned_text = excluded.cleaned_text, \
                 language = excluded.language, \
                 timestamp = excluded.timestamp, \
                 user_id = excluded.user_id, \
                 sentiment = excluded.sentiment, \
                 sentiment_confidence = excluded.sentiment_confidence, \
                 media_json = excluded.media_json, \
                 entities_json = excluded.entities_json, \
                 metadata_json = excluded.metadata_json, \
                 updated_at = excluded.updated_at",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .execute(params![
            post.post_id,
            file_id,
            post.platform,
            post.raw_text,
            post.cleaned_text,
            post.language,
            post.timestamp.timestamp_millis(),
            post.user_id,
            post.sentiment.map(|s| s.as_str()),
            post.sentiment_confidence,
            media_json,
            entities_json,
            metadata_json,
            now,
        ])
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a post by id.
    pub fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached("SELECT * FROM posts WHERE post_id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![post_id], |row| Ok(Self::row_to_post(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row)
    }

    /// Delete a post. Returns true if a row was removed.
    pub fn delete_post(&self, post_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute("DELETE FROM posts WHERE post_id = ?1", params![post_id])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Merge a partial JSON update into a post (the PUT endpoint contract).
    /// Unknown keys land in metadata-free fields only if they deserialize;
    /// `post_id` itself is never changed.
    pub fn merge_post(&self, post_id: &str, updates: &serde_json::Value) -> Result<bool> {
        let (file_id, post) = {
            let conn = self.conn.lock();
            let found: Option<(String, Post)> = conn
                .prepare_cached("SELECT * FROM posts WHERE post_id = ?1")
                .map_err(|e| Error::Database(e.to_string()))?
                .query_row(params![post_id], |row| {
                    Ok((row.get("file_id").unwrap_or_default(), Self::row_to_post(row)))
                })
                .optional()
                .map_err(|e| Error::Database(e.to_string()))?;
            match found {
                Some(pair) => pair,
                None => return Ok(false),
            }
        };

        let mut as_json = serde_json::to_value(&post)?;
        if let (Some(obj), Some(update_map)) = (as_json.as_object_mut(), updates.as_object()) {
            for (k, v) in update_map {
                if k == "post_id" {
                    continue;
                }
                obj.insert(k.clone(), v.clone());
            }
        }
        let merged: Post = serde_json::from_value(as_json)
            .map_err(|e| Error::Internal(format!("Invalid post update: {}", e)))?;

        self.upsert_post(&file_id, &merged)?;
        Ok(true)
    }

    /// Query posts matching a filter, newest first.
    pub fn query_posts(&self, filter: &PostFilter) -> Result<Vec<Post>> {
        let (clause, mut values) = Self::filter_clause(filter);
        let sql = format!(
            "SELECT * FROM posts{} ORDER BY timestamp DESC LIMIT ? OFFSET ?",
            clause
        );
        values.push(SqlValue::Integer(
            filter.limit.map(|l| l as i64).unwrap_or(-1),
        ));
        values.push(SqlValue::Integer(filter.skip.unwrap_or(0) as i64));

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| Ok(Self::row_to_post(row)))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Count posts matching a filter.
    pub fn count_posts(&self, filter: &PostFilter) -> Result<i64> {
        let (clause, values) = Self::filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM posts{}", clause);

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| Error::Database(e.to_string()))?;
        stmt.query_row(params_from_iter(values), |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// All posts belonging to one upload batch, in insertion order.
    pub fn get_posts_for_file(&self, file_id: &str) -> Result<Vec<Post>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT * FROM posts WHERE file_id = ?1 ORDER BY created_at, post_id")
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![file_id], |row| Ok(Self::row_to_post(row)))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// File ids of batches that still have un-enriched posts. Used by the
    /// startup catch-up pass to re-enqueue interrupted enrichment.
    pub fn unenriched_file_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT DISTINCT p.file_id FROM posts p \
                 JOIN uploads u ON u.file_id = p.file_id \
                 WHERE p.cleaned_text IS NULL AND u.status != 'error'",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Store-level statistics.
    pub fn stats(&self) -> Result<StoreStats> {
        let total_posts = self.count_posts(&PostFilter::all())?;
        let total_uploads = self.count_uploads()?;

        let conn = self.conn.lock();
        let enriched_posts: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM posts WHERE cleaned_text IS NOT NULL",
                [],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let posts_with_media: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM posts WHERE media_json != '[]'",
                [],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        let db_size_mb = std::fs::metadata(&self.db_path)
            .map(|m| m.len() as f64 / (1024.0 * 1024.0))
            .unwrap_or(0.0);

        Ok(StoreStats {
            total_posts,
            enriched_posts,
            posts_with_media,
            total_uploads,
            db_path: self.db_path.to_string_lossy().to_string(),
            db_size_mb,
        })
    }

    // ---------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------

    /// Build the WHERE clause and bound values for a filter.
    pub(crate) fn filter_clause(filter: &PostFilter) -> (String, Vec<SqlValue>) {
        let mut conds: Vec<String> = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        if let Some(platform) = &filter.platform {
            conds.push("platform = ?".to_string());
            values.push(SqlValue::Text(platform.clone()));
        }
        if let Some(sentiment) = filter.sentiment {
            conds.push("sentiment = ?".to_string());
            values.push(SqlValue::Text(sentiment.as_str().to_string()));
        }
        if let Some(language) = &filter.language {
            conds.push("language = ?".to_string());
            values.push(SqlValue::Text(language.clone()));
        }
        if let Some(from) = filter.date_from {
            conds.push("timestamp >= ?".to_string());
            values.push(SqlValue::Integer(from.timestamp_millis()));
        }
        if let Some(to) = filter.date_to {
            conds.push("timestamp <= ?".to_string());
            values.push(SqlValue::Integer(to.timestamp_millis()));
        }
        if let Some(has_media) = filter.has_media {
            if has_media {
                conds.push("media_json != '[]'".to_string());
            } else {
                conds.push("media_json = '[]'".to_string());
            }
        }
        if let Some(search) = &filter.search_text {
            conds.push("(raw_text LIKE ? OR cleaned_text LIKE ?)".to_string());
            let pattern = format!("%{}%", search);
            values.push(SqlValue::Text(pattern.clone()));
            values.push(SqlValue::Text(pattern));
        }

        if conds.is_empty() {
            (String::new(), values)
        } else {
            (format!(" WHERE {}", conds.join(" AND ")), values)
        }
    }

    pub(crate) fn row_to_post(row: &rusqlite::Row<'_>) -> Post {
        let media: Vec<MediaItem> = row
            .get::<_, String>("media_json")
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        let entities: Vec<String> = row
            .get::<_, String>("entities_json")
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        let metadata = row
            .get::<_, String>("metadata_json")
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        let timestamp = row
            .get::<_, i64>("timestamp")
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(Utc::now);

        Post {
            platform: row.get("platform").unwrap_or_else(|_| "unknown".to_string()),
            post_id: row.get("post_id").unwrap_or_default(),
            raw_text: row.get("raw_text").unwrap_or_default(),
            timestamp,
            user_id: row.get("user_id").unwrap_or_default(),
            media,
            metadata,
            cleaned_text: row.get("cleaned_text").ok().flatten(),
            language: row.get("language").ok().flatten(),
            entities,
            sentiment: row
                .get::<_, Option<String>>("sentiment")
                .ok()
                .flatten()
                .and_then(|s| Sentiment::parse(&s)),
            sentiment_confidence: row.get("sentiment_confidence").ok().flatten(),
        }
    }

    fn row_to_upload(row: &rusqlite::Row<'_>) -> UploadBatch {
        let upload_time = row
            .get::<_, i64>("upload_time")
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(Utc::now);

        UploadBatch {
            file_id: row.get("file_id").unwrap_or_default(),
            filename: row.get("filename").unwrap_or_default(),
            upload_time,
            total_posts: row.get::<_, i64>("total_posts").unwrap_or(0) as usize,
            status: row
                .get::<_, String>("status")
                .ok()
                .and_then(|s| UploadStatus::parse(&s))
                .unwrap_or(UploadStatus::Uploaded),
            content_hash: row.get("content_hash").unwrap_or_default(),
            error: row.get("error").ok().flatten(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (PostStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = PostStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn sample_post(id: &str, text: &str) -> Post {
        Post {
            platform: "twitter".to_string(),
            post_id: id.to_string(),
            raw_text: text.to_string(),
            timestamp: Utc::now(),
            user_id: "u1".to_string(),
            media: Vec::new(),
            metadata: Default::default(),
            cleaned_text: None,
            language: None,
            entities: Vec::new(),
            sentiment: None,
            sentiment_confidence: None,
        }
    }

    #[test]
    fn test_insert_and_get_post() {
        let (store, _dir) = test_store();
        let post = sample_post("p1", "hello world");
        store.insert_posts("f1", std::slice::from_ref(&post)).unwrap();

        let loaded = store.get_post("p1").unwrap().unwrap();
        assert_eq!(loaded.raw_text, "hello world");
        assert_eq!(loaded.platform, "twitter");
        assert!(loaded.cleaned_text.is_none());
    }

    #[test]
    fn test_upsert_last_writer_wins() {
        let (store, _dir) = test_store();
        store.insert_posts("f1", &[sample_post("p1", "first")]).unwrap();

        let mut updated = sample_post("p1", "first");
        updated.cleaned_text = Some("first".to_string());
        updated.sentiment = Some(Sentiment::Positive);
        updated.sentiment_confidence = Some(0.7);
        store.upsert_post("f1", &updated).unwrap();

        let loaded = store.get_post("p1").unwrap().unwrap();
        assert_eq!(loaded.cleaned_text.as_deref(), Some("first"));
        assert_eq!(loaded.sentiment, Some(Sentiment::Positive));
        assert_eq!(store.count_posts(&PostFilter::all()).unwrap(), 1);
    }

    #[test]
    fn test_filter_by_platform_and_media() {
        let (store, _dir) = test_store();
        let mut with_media = sample_post("p1", "has media");
        with_media.media.push(MediaItem::image("http://x/a.jpg"));
        let mut other = sample_post("p2", "no media");
        other.platform = "instagram".to_string();
        store.insert_posts("f1", &[with_media, other]).unwrap();

        let filter = PostFilter {
            platform: Some("twitter".to_string()),
            ..Default::default()
        };
        let posts = store.query_posts(&filter).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].post_id, "p1");

        let filter = PostFilter {
            has_media: Some(true),
            ..Default::default()
        };
        assert_eq!(store.count_posts(&filter).unwrap(), 1);

        let filter = PostFilter {
            has_media: Some(false),
            ..Default::default()
        };
        let posts = store.query_posts(&filter).unwrap();
        assert_eq!(posts[0].post_id, "p2");
    }

    #[test]
    fn test_search_text_matches_raw_and_cleaned() {
        let (store, _dir) = test_store();
        let mut post = sample_post("p1", "Check out http://t.co/x #rust");
        post.cleaned_text = Some("Check out rust".to_string());
        store.insert_posts("f1", std::slice::from_ref(&post)).unwrap();

        let filter = PostFilter {
            search_text: Some("rust".to_string()),
            ..Default::default()
        };
        assert_eq!(store.query_posts(&filter).unwrap().len(), 1);

        let filter = PostFilter {
            search_text: Some("python".to_string()),
            ..Default::default()
        };
        assert!(store.query_posts(&filter).unwrap().is_empty());
    }

    #[test]
    fn test_merge_post_partial_update() {
        let (store, _dir) = test_store();
        store.insert_posts("f1", &[sample_post("p1", "original")]).unwrap();

        let updated = store
            .merge_post("p1", &serde_json::json!({"language": "en", "post_id": "hax"}))
            .unwrap();
        assert!(updated);

        let loaded = store.get_post("p1").unwrap().unwrap();
        assert_eq!(loaded.language.as_deref(), Some("en"));
        assert_eq!(loaded.raw_text, "original");
        assert!(store.get_post("hax").unwrap().is_none());
    }

    #[test]
    fn test_upload_status_is_monotonic() {
        let (store, _dir) = test_store();
        let batch = UploadBatch::new("posts.json", 3, "abc".to_string());
        let file_id = batch.file_id.clone();
        store.insert_upload(&batch).unwrap();

        assert!(store
            .set_upload_status(&file_id, UploadStatus::Processing, None)
            .unwrap());
        assert!(store
            .set_upload_status(&file_id, UploadStatus::Completed, None)
            .unwrap());
        // Terminal: neither a regression nor a sideways move is applied.
        assert!(!store
            .set_upload_status(&file_id, UploadStatus::Processing, None)
            .unwrap());
        assert!(!store
            .set_upload_status(&file_id, UploadStatus::Error, Some("late"))
            .unwrap());

        let loaded = store.get_upload(&file_id).unwrap().unwrap();
        assert_eq!(loaded.status, UploadStatus::Completed);
        assert!(loaded.error.is_none());
    }

    #[test]
    fn test_unenriched_file_ids() {
        let (store, _dir) = test_store();
        let batch = UploadBatch::new("a.json", 1, "h".to_string());
        let file_id = batch.file_id.clone();
        store.insert_upload(&batch).unwrap();
        store.insert_posts(&file_id, &[sample_post("p1", "text")]).unwrap();

        assert_eq!(store.unenriched_file_ids().unwrap(), vec![file_id.clone()]);

        let mut enriched = sample_post("p1", "text");
        enriched.cleaned_text = Some("text".to_string());
        store.upsert_post(&file_id, &enriched).unwrap();
        assert!(store.unenriched_file_ids().unwrap().is_empty());
    }
}
