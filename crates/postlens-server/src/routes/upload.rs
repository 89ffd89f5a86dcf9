//! Upload routes — the ingestion entry point.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::error;

use crate::state::AppState;
use postlens_core::Error;
use postlens_ingest::IngestCoordinator;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload", post(upload_file))
        .route("/upload/{file_id}", get(upload_status))
}

/// POST /api/upload — ingest one export file and queue enrichment.
///
/// The response is returned as soon as the raw posts are persisted; the
/// caller never waits on enrichment.
async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let filename = match field.file_name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        match field.bytes().await {
            Ok(bytes) => {
                upload = Some((filename, bytes.to_vec()));
                break;
            }
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read upload: {}", e),
                )
            }
        }
    }

    let (filename, bytes) = match upload {
        Some(pair) => pair,
        None => return error_response(StatusCode::BAD_REQUEST, "No file provided".to_string()),
    };

    // Parsing and normalization are synchronous; keep them off the executor.
    let ingest_state = state.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let coordinator = IngestCoordinator::new(
            &ingest_state.store,
            &ingest_state.config.data_paths.uploads,
        );
        coordinator.ingest(&filename, &bytes)
    })
    .await;

    match outcome {
        Ok(Ok(outcome)) => {
            let file_id = outcome.batch.file_id.clone();
            let total_posts = outcome.batch.total_posts;
            state.enqueue_enrichment(file_id.clone(), outcome.posts);

            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "message": "File uploaded successfully",
                    "file_id": file_id,
                    "total_posts": total_posts,
                    "processing_status": "processing",
                })),
            )
        }
        Ok(Err(e @ (Error::UnsupportedFormat(_) | Error::Parse { .. }))) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Ok(Err(e)) => {
            error!("Upload failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            error!("Upload task failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Upload processing failed".to_string(),
            )
        }
    }
}

/// GET /api/upload/{file_id} — poll one batch's processing status.
async fn upload_status(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.store.get_upload(&file_id) {
        Ok(Some(batch)) => (
            StatusCode::OK,
            Json(serde_json::to_value(&batch).unwrap_or_default()),
        ),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Upload not found".to_string()),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn error_response(status: StatusCode, detail: String) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(serde_json::json!({ "detail": detail })))
}
