use std::sync::Arc;

use crate::config::Config;
use crate::embedding::Embedder;
use crate::index::VectorIndex;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Long-lived, read-only job index client shared across requests.
    pub index: Arc<dyn VectorIndex>,
    /// `None` when no embedding provider is configured.
    pub embedder: Option<Arc<dyn Embedder>>,
    pub config: Config,
}
