//! PostLens Store — SQLite-backed document store for posts and upload batches.

pub mod aggregate;
pub mod schema;
pub mod sqlite;
pub mod types;

pub use aggregate::{AnalyticsSummary, DailyCount, EntityCount, PopularContent, TagCount};
pub use sqlite::PostStore;
pub use types::{PostFilter, StoreStats};
