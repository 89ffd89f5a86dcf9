//! PostLens — social-media export ingestion and analysis server.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod enrichment;
mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("POSTLENS_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = postlens_core::PostLensConfig::from_env(&data_dir)?;
    let port = config.port;

    let store = postlens_store::PostStore::open(&config.data_paths.db)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;

    // Providers load once per process and are injected everywhere they are
    // needed; the worker never re-initializes them per post.
    let text_enricher = postlens_enrich::create_text_enricher(&config.data_paths.models);
    let image_enricher = postlens_enrich::create_image_enricher(&config.data_paths.models);

    let state = Arc::new(AppState::new(config, store, text_enricher, image_enricher));

    // Start the background enrichment queue consumer.
    enrichment::start_enrichment_worker(state.clone());

    let app = routes::build_router(state.clone());

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("PostLens server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
