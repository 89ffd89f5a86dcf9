//! Analytics routes — dashboard aggregations, trends, insights.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::routes::posts::parse_day;
use crate::state::AppState;
use postlens_store::PostFilter;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analytics/dashboard", get(dashboard))
        .route("/analytics/trends/sentiment", get(sentiment_trends))
        .route("/analytics/insights/popular-content", get(popular_content))
}

#[derive(Debug, Deserialize)]
struct DashboardQuery {
    date_from: Option<String>,
    date_to: Option<String>,
}

/// GET /api/analytics/dashboard — full corpus summary, optionally limited
/// to a date window. Unparseable dates are ignored rather than rejected.
async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> (StatusCode, Json<serde_json::Value>) {
    let filter = PostFilter {
        date_from: query.date_from.as_deref().and_then(parse_day),
        date_to: query.date_to.as_deref().and_then(parse_day),
        ..Default::default()
    };

    match state.store.analytics_summary(&filter) {
        Ok(summary) => (
            StatusCode::OK,
            Json(serde_json::to_value(&summary).unwrap_or_default()),
        ),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct TrendsQuery {
    #[serde(default = "default_days")]
    days: i64,
}

fn default_days() -> i64 {
    30
}

/// GET /api/analytics/trends/sentiment — per-day sentiment counts.
async fn sentiment_trends(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrendsQuery>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.store.sentiment_trends(query.days) {
        Ok(trends) => (
            StatusCode::OK,
            Json(serde_json::json!({ "trends": trends })),
        ),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct InsightsQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    10
}

/// GET /api/analytics/insights/popular-content
async fn popular_content(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InsightsQuery>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.store.popular_content(query.limit) {
        Ok(content) => (
            StatusCode::OK,
            Json(serde_json::to_value(&content).unwrap_or_default()),
        ),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn error_response(status: StatusCode, detail: String) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(serde_json::json!({ "detail": detail })))
}
