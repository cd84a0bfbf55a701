use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::index::RetrievalError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, retryable) = match &self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                false,
            ),
            AppError::Retrieval(RetrievalError::Api { status: 404, message }) => {
                tracing::warn!("Index query rejected (404): {message}");
                (
                    StatusCode::NOT_FOUND,
                    "INDEX_NOT_FOUND",
                    format!("The job index rejected the query: {message}"),
                    false,
                )
            }
            AppError::Retrieval(e @ RetrievalError::Api { status, message })
                if !e.is_transient() =>
            {
                tracing::warn!("Index query rejected ({status}): {message}");
                (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    format!("The job index rejected the query: {message}"),
                    false,
                )
            }
            AppError::Retrieval(e) => {
                tracing::error!("Retrieval error: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "RETRIEVAL_ERROR",
                    "The job index is unreachable, please try again".to_string(),
                    true,
                )
            }
            AppError::Embedding(EmbeddingError::RateLimited { retries }) => {
                tracing::warn!("Embedding provider still rate limiting after {retries} retries");
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "EMBEDDING_RATE_LIMITED",
                    "The embedding provider is rate limiting requests, please try again later"
                        .to_string(),
                    true,
                )
            }
            AppError::Embedding(e) => {
                tracing::error!("Embedding error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "EMBEDDING_ERROR",
                    "The embedding provider failed, please try again".to_string(),
                    true,
                )
            }
            AppError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "UNAVAILABLE",
                msg.clone(),
                false,
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
                "retryable": retryable
            }
        }));

        (status, body).into_response()
    }
}
