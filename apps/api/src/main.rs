mod config;
mod embedding;
mod errors;
mod index;
mod matching;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::embedding::openai::OpenAiEmbedder;
use crate::embedding::Embedder;
use crate::index::qdrant::QdrantIndex;
use crate::routes::build_router;
use crate::state::AppState;

const INDEX_TIMEOUT: Duration = Duration::from_secs(30);
const EMBEDDING_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Career Vector API v{}", env!("CARGO_PKG_VERSION"));

    // Shared Qdrant client, reused across requests
    let index = QdrantIndex::new(
        &config.qdrant_url,
        config.qdrant_api_key.as_deref(),
        INDEX_TIMEOUT,
    )?;
    info!(
        "Qdrant client initialized ({}, collection: {})",
        config.qdrant_url, config.job_collection
    );

    let embedder: Option<Arc<dyn Embedder>> = match config.openai_api_key.as_deref() {
        Some(key) => {
            let embedder = OpenAiEmbedder::new(
                key,
                &config.openai_base_url,
                &config.embedding_model,
                EMBEDDING_TIMEOUT,
            )?;
            info!("Embedding client initialized (model: {})", config.embedding_model);
            Some(Arc::new(embedder))
        }
        None => {
            warn!("OPENAI_API_KEY not set; /api/v1/jobs/match is disabled");
            None
        }
    };

    let state = AppState {
        index: Arc::new(index),
        embedder,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
