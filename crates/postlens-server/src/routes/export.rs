//! Export routes — filtered CSV/JSON downloads of the posts collection.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;

use crate::state::AppState;
use postlens_core::Post;
use postlens_store::PostFilter;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/export/csv", post(export_csv))
        .route("/export/json", post(export_json))
}

/// Export request body: optional filter plus an optional field projection.
#[derive(Debug, Default, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub filters: Option<PostFilter>,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

/// Default CSV columns when no projection is given.
const DEFAULT_FIELDS: [&str; 10] = [
    "post_id",
    "platform",
    "raw_text",
    "cleaned_text",
    "language",
    "timestamp",
    "user_id",
    "sentiment",
    "entities",
    "media_count",
];

/// POST /api/export/csv
async fn export_csv(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExportRequest>,
) -> Response {
    let posts = match fetch_for_export(&state, &request) {
        Ok(posts) => posts,
        Err(response) => return response,
    };

    let fields: Vec<String> = request
        .fields
        .unwrap_or_else(|| DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect());

    let mut writer = csv::Writer::from_writer(Vec::new());
    if writer.write_record(&fields).is_err() {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "CSV write failed");
    }
    for post in &posts {
        let as_json = serde_json::to_value(post).unwrap_or_default();
        let row: Vec<String> = fields
            .iter()
            .map(|field| csv_field(post, &as_json, field))
            .collect();
        if writer.write_record(&row).is_err() {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "CSV write failed");
        }
    }
    let body = match writer.into_inner() {
        Ok(body) => body,
        Err(_) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, "CSV write failed"),
    };

    attachment_response(body, "csv", "text/csv")
}

/// POST /api/export/json
async fn export_json(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExportRequest>,
) -> Response {
    let posts = match fetch_for_export(&state, &request) {
        Ok(posts) => posts,
        Err(response) => return response,
    };

    let mut values: Vec<serde_json::Value> = posts
        .iter()
        .filter_map(|post| serde_json::to_value(post).ok())
        .collect();

    // Optional field projection.
    if let Some(fields) = &request.fields {
        for value in &mut values {
            if let Some(obj) = value.as_object_mut() {
                obj.retain(|key, _| fields.iter().any(|f| f == key));
            }
        }
    }

    let body = match serde_json::to_vec_pretty(&values) {
        Ok(body) => body,
        Err(_) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, "JSON write failed"),
    };

    attachment_response(body, "json", "application/json")
}

/// Run the export query; empty results are a 404 like the list-less
/// download would otherwise be silent.
fn fetch_for_export(state: &AppState, request: &ExportRequest) -> Result<Vec<Post>, Response> {
    let filter = request.filters.clone().unwrap_or_default().unpaged();
    match state.store.query_posts(&filter) {
        Ok(posts) if posts.is_empty() => {
            Err(error_response(StatusCode::NOT_FOUND, "No data found for export"))
        }
        Ok(posts) => Ok(posts),
        Err(e) => Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &e.to_string(),
        )),
    }
}

/// One CSV cell. `media_count` and `entities` are derived columns; every
/// other field comes from the post's JSON form.
fn csv_field(post: &Post, as_json: &serde_json::Value, field: &str) -> String {
    match field {
        "media_count" => post.media.len().to_string(),
        "entities" => post.entities.join(", "),
        "timestamp" => post.timestamp.to_rfc3339(),
        _ => match as_json.get(field) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        },
    }
}

fn attachment_response(body: Vec<u8>, extension: &str, content_type: &str) -> Response {
    let filename = format!(
        "postlens_export_{}.{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        extension
    );
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", filename),
            ),
        ],
        body,
    )
        .into_response()
}

fn error_response(status: StatusCode, detail: &str) -> Response {
    (status, Json(serde_json::json!({ "detail": detail }))).into_response()
}
