//! Database schema SQL.

/// Core tables: posts (keyed by post_id, upsert target) and uploads
/// (one row per ingested file).
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    post_id TEXT PRIMARY KEY,
    file_id TEXT NOT NULL,
    platform TEXT NOT NULL DEFAULT 'unknown',
    raw_text TEXT NOT NULL,
    cleaned_text TEXT,
    language TEXT,
    timestamp INTEGER NOT NULL,
    user_id TEXT NOT NULL DEFAULT '',
    sentiment TEXT,
    sentiment_confidence REAL,
    media_json TEXT NOT NULL DEFAULT '[]',
    entities_json TEXT NOT NULL DEFAULT '[]',
    metadata_json TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL,
    updated_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_posts_file_id ON posts(file_id);
CREATE INDEX IF NOT EXISTS idx_posts_platform ON posts(platform);
CREATE INDEX IF NOT EXISTS idx_posts_sentiment ON posts(sentiment);
CREATE INDEX IF NOT EXISTS idx_posts_language ON posts(language);
CREATE INDEX IF NOT EXISTS idx_posts_timestamp ON posts(timestamp);

CREATE TABLE IF NOT EXISTS uploads (
    file_id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    upload_time INTEGER NOT NULL,
    total_posts INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'uploaded',
    content_hash TEXT NOT NULL DEFAULT '',
    error TEXT
);

CREATE INDEX IF NOT EXISTS idx_uploads_status ON uploads(status);
"#;
