//! Analytics aggregations over the posts collection.
//!
//! Scalar columns (platform, sentiment, language, day) are grouped in SQL;
//! JSON-array fields (entities, media tags) are tallied in Rust over the
//! filtered rows.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use rusqlite::params_from_iter;
use serde::{Deserialize, Serialize};

use crate::sqlite::PostStore;
use crate::types::PostFilter;
use postlens_core::{Error, Post, Result};

/// Dashboard analytics over a (possibly date-filtered) slice of the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_posts: i64,
    pub platforms: BTreeMap<String, i64>,
    pub sentiments: BTreeMap<String, i64>,
    pub languages: BTreeMap<String, i64>,
    pub media_types: BTreeMap<String, i64>,
    pub top_entities: Vec<EntityCount>,
    pub top_tags: Vec<TagCount>,
    pub daily_posts: Vec<DailyCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityCount {
    pub entity: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

/// Per-day sentiment counts for the trends endpoint.
pub type SentimentTrends = BTreeMap<String, BTreeMap<String, i64>>;

/// Popular-content insights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopularContent {
    pub engaging_posts: Vec<Post>,
    pub common_entities: Vec<EntityCount>,
    pub common_tags: Vec<TagCount>,
}

const TOP_N: usize = 10;
const DAILY_LIMIT: usize = 30;

impl PostStore {
    /// Full dashboard summary for the analytics endpoint.
    pub fn analytics_summary(&self, filter: &PostFilter) -> Result<AnalyticsSummary> {
        let total_posts = self.count_posts(filter)?;
        let platforms = self.counts_by_column("platform", filter)?;
        let sentiments = self.counts_by_column("sentiment", filter)?;
        let languages = self.counts_by_column("language", filter)?;
        let daily_posts = self.daily_counts(filter)?;

        // Tally the JSON-array fields over the filtered rows.
        let rows = self.query_posts(&filter.clone().unpaged())?;
        let mut media_types: BTreeMap<String, i64> = BTreeMap::new();
        let mut entity_counts: BTreeMap<String, i64> = BTreeMap::new();
        let mut tag_counts: BTreeMap<String, i64> = BTreeMap::new();
        for post in &rows {
            for item in &post.media {
                *media_types.entry(item.media_type.clone()).or_default() += 1;
                for tag in &item.tags {
                    *tag_counts.entry(tag.clone()).or_default() += 1;
                }
            }
            for entity in &post.entities {
                *entity_counts.entry(entity.clone()).or_default() += 1;
            }
        }

        Ok(AnalyticsSummary {
            total_posts,
            platforms,
            sentiments,
            languages,
            media_types,
            top_entities: top_n(entity_counts)
                .into_iter()
                .map(|(entity, count)| EntityCount { entity, count })
                .collect(),
            top_tags: top_n(tag_counts)
                .into_iter()
                .map(|(tag, count)| TagCount { tag, count })
                .collect(),
            daily_posts,
        })
    }

    /// Sentiment counts per day over the trailing `days` window.
    pub fn sentiment_trends(&self, days: i64) -> Result<SentimentTrends> {
        let start = Utc::now() - Duration::days(days);

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT date(timestamp / 1000, 'unixepoch') AS day, sentiment, COUNT(*) \
                 FROM posts \
                 WHERE timestamp >= ?1 AND sentiment IS NOT NULL \
                 GROUP BY day, sentiment \
                 ORDER BY day",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map([start.timestamp_millis()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut trends: SentimentTrends = BTreeMap::new();
        for row in rows.filter_map(|r| r.ok()) {
            let (day, sentiment, count) = row;
            let bucket = trends.entry(day).or_insert_with(|| {
                BTreeMap::from([
                    ("positive".to_string(), 0),
                    ("negative".to_string(), 0),
                    ("neutral".to_string(), 0),
                ])
            });
            bucket.insert(sentiment, count);
        }
        Ok(trends)
    }

    /// Posts with media plus the most common entities and media tags.
    pub fn popular_content(&self, limit: usize) -> Result<PopularContent> {
        let engaging_posts = self.query_posts(&PostFilter {
            has_media: Some(true),
            limit: Some(limit),
            ..Default::default()
        })?;

        let all = self.query_posts(&PostFilter::all())?;
        let mut entity_counts: BTreeMap<String, i64> = BTreeMap::new();
        let mut tag_counts: BTreeMap<String, i64> = BTreeMap::new();
        for post in &all {
            for entity in &post.entities {
                *entity_counts.entry(entity.clone()).or_default() += 1;
            }
            for item in &post.media {
                for tag in &item.tags {
                    *tag_counts.entry(tag.clone()).or_default() += 1;
                }
            }
        }

        let mut common_entities: Vec<EntityCount> = top_n(entity_counts)
            .into_iter()
            .map(|(entity, count)| EntityCount { entity, count })
            .collect();
        common_entities.truncate(limit);
        let mut common_tags: Vec<TagCount> = top_n(tag_counts)
            .into_iter()
            .map(|(tag, count)| TagCount { tag, count })
            .collect();
        common_tags.truncate(limit);

        Ok(PopularContent {
            engaging_posts,
            common_entities,
            common_tags,
        })
    }

    /// Counts grouped by one scalar column, NULLs excluded.
    fn counts_by_column(&self, column: &str, filter: &PostFilter) -> Result<BTreeMap<String, i64>> {
        // Column names are compile-time constants from this module only.
        debug_assert!(["platform", "sentiment", "language"].contains(&column));

        let (clause, values) = Self::filter_clause(filter);
        let not_null = if clause.is_empty() {
            format!(" WHERE {} IS NOT NULL", column)
        } else {
            format!("{} AND {} IS NOT NULL", clause, column)
        };
        let sql = format!(
            "SELECT {}, COUNT(*) FROM posts{} GROUP BY {}",
            column, not_null, column
        );

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Post counts per day for the filtered slice, oldest first, capped.
    fn daily_counts(&self, filter: &PostFilter) -> Result<Vec<DailyCount>> {
        let (clause, mut values) = Self::filter_clause(filter);
        let sql = format!(
            "SELECT date(timestamp / 1000, 'unixepoch') AS day, COUNT(*) \
             FROM posts{} GROUP BY day ORDER BY day LIMIT ?",
            clause
        );
        values.push(rusqlite::types::Value::Integer(DAILY_LIMIT as i64));

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(DailyCount {
                    date: row.get(0)?,
                    count: row.get(1)?,
                })
            })
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

/// Sort a tally map by descending count and keep the top entries.
fn top_n(counts: BTreeMap<String, i64>) -> Vec<(String, i64)> {
    let mut entries: Vec<(String, i64)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(TOP_N);
    entries
}
