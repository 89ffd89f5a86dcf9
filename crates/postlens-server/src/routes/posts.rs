//! Post data routes — filtered reads, updates, deletes, overview stats.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;

use crate::state::AppState;
use postlens_core::Sentiment;
use postlens_store::PostFilter;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/data", get(list_posts))
        .route("/data/stats/overview", get(stats_overview))
        .route(
            "/data/{post_id}",
            get(get_post).put(update_post).delete(delete_post),
        )
}

/// Query parameters accepted by the list endpoint.
#[derive(Debug, Deserialize)]
pub struct PostQuery {
    pub platform: Option<String>,
    pub sentiment: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub language: Option<String>,
    pub has_media: Option<bool>,
    pub search_text: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub skip: usize,
}

fn default_limit() -> usize {
    50
}

/// GET /api/data — posts matching the filter vocabulary, newest first.
async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PostQuery>,
) -> (StatusCode, Json<serde_json::Value>) {
    let filter = match build_filter(&query) {
        Ok(filter) => filter,
        Err(detail) => return error_response(StatusCode::BAD_REQUEST, detail),
    };

    match state.store.query_posts(&filter) {
        Ok(posts) => (
            StatusCode::OK,
            Json(serde_json::to_value(&posts).unwrap_or_default()),
        ),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// GET /api/data/{post_id}
async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.store.get_post(&post_id) {
        Ok(Some(post)) => (
            StatusCode::OK,
            Json(serde_json::to_value(&post).unwrap_or_default()),
        ),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Post not found".to_string()),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// PUT /api/data/{post_id} — merge a partial update into one post.
async fn update_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
    Json(updates): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.store.merge_post(&post_id, &updates) {
        Ok(true) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "Post updated successfully" })),
        ),
        Ok(false) => error_response(StatusCode::NOT_FOUND, "Post not found".to_string()),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// DELETE /api/data/{post_id}
async fn delete_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.store.delete_post(&post_id) {
        Ok(true) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "Post deleted successfully" })),
        ),
        Ok(false) => error_response(StatusCode::NOT_FOUND, "Post not found".to_string()),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// GET /api/data/stats/overview — corpus overview counts.
async fn stats_overview(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let summary = match state.store.analytics_summary(&PostFilter::all()) {
        Ok(summary) => summary,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    let stats = match state.store.stats() {
        Ok(stats) => stats,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "total_posts": summary.total_posts,
            "platforms": summary.platforms,
            "sentiments": summary.sentiments,
            "languages": summary.languages,
            "posts_with_media": stats.posts_with_media,
        })),
    )
}

/// Translate query parameters into a store filter. Bad dates and unknown
/// sentiment labels are the caller's mistake, not a silent no-match.
pub fn build_filter(query: &PostQuery) -> Result<PostFilter, String> {
    let sentiment = match &query.sentiment {
        Some(s) => Some(Sentiment::parse(s).ok_or_else(|| "Invalid sentiment value".to_string())?),
        None => None,
    };
    let date_from = match &query.date_from {
        Some(s) => Some(parse_day(s).ok_or_else(|| "Invalid date_from format".to_string())?),
        None => None,
    };
    let date_to = match &query.date_to {
        Some(s) => Some(parse_day(s).ok_or_else(|| "Invalid date_to format".to_string())?),
        None => None,
    };

    Ok(PostFilter {
        platform: query.platform.clone(),
        sentiment,
        language: query.language.clone(),
        date_from,
        date_to,
        has_media: query.has_media,
        search_text: query.search_text.clone(),
        limit: Some(query.limit),
        skip: Some(query.skip),
    })
}

/// Parse a `YYYY-MM-DD` query parameter as the start of that UTC day.
pub fn parse_day(s: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)))
}

fn error_response(status: StatusCode, detail: String) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(serde_json::json!({ "detail": detail })))
}
