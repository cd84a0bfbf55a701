pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::matching::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Job matching API
        .route("/api/v1/jobs/filters", get(handlers::handle_filter_catalogue))
        .route("/api/v1/jobs/search", post(handlers::handle_search))
        .route("/api/v1/jobs/match", post(handlers::handle_match))
        .with_state(state)
}
