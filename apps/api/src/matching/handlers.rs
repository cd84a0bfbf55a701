//! Axum route handlers for the job matching API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Config;
use crate::embedding::chunker::{chunk_text, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::errors::AppError;
use crate::matching::filter::{FilterKey, FilterOptions, JOB_TYPES};
use crate::matching::format::JobCard;
use crate::matching::search::{search, SearchOptions};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub resume_vectors: Vec<Vec<f32>>,
    #[serde(default)]
    pub filters: FilterOptions,
    pub collection: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub resume_text: String,
    #[serde(default)]
    pub filters: FilterOptions,
    pub collection: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub jobs: Vec<JobCard>,
    pub total: usize,
}

impl From<Vec<JobCard>> for SearchResponse {
    fn from(jobs: Vec<JobCard>) -> Self {
        Self {
            total: jobs.len(),
            jobs,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FilterCatalogue {
    pub keys: Vec<&'static str>,
    pub job_types: &'static [&'static str],
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/jobs/filters
pub async fn handle_filter_catalogue() -> Json<FilterCatalogue> {
    Json(FilterCatalogue {
        keys: FilterKey::ALL.iter().map(FilterKey::as_str).collect(),
        job_types: JOB_TYPES,
    })
}

/// POST /api/v1/jobs/search
///
/// Ranks jobs against caller-supplied resume chunk vectors.
pub async fn handle_search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if request.resume_vectors.is_empty() {
        return Err(AppError::Validation(
            "resume_vectors cannot be empty".to_string(),
        ));
    }
    if request.resume_vectors.iter().any(|v| v.is_empty()) {
        return Err(AppError::Validation(
            "resume_vectors cannot contain empty vectors".to_string(),
        ));
    }
    let dim = request.resume_vectors[0].len();
    if request.resume_vectors.iter().any(|v| v.len() != dim) {
        return Err(AppError::Validation(
            "resume_vectors must all have the same dimension".to_string(),
        ));
    }
    check_chunk_count(request.resume_vectors.len(), state.config.max_resume_chunks)?;
    let options = resolve_options(&state.config, request.collection, request.limit)?;

    let jobs = search(
        state.index.as_ref(),
        &request.resume_vectors,
        &request.filters,
        &options,
    )
    .await?;

    Ok(Json(jobs.into()))
}

/// POST /api/v1/jobs/match
///
/// Chunks and embeds resume text, then ranks jobs against it.
pub async fn handle_match(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let embedder = state.embedder.as_ref().ok_or_else(|| {
        AppError::Unavailable("No embedding provider is configured".to_string())
    })?;

    let mut chunks = chunk_text(&request.resume_text, DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP);
    if chunks.is_empty() {
        return Err(AppError::Validation("resume_text cannot be empty".to_string()));
    }
    let options = resolve_options(&state.config, request.collection, request.limit)?;
    if !options.multi_chunk {
        chunks.truncate(1);
    }
    check_chunk_count(chunks.len(), state.config.max_resume_chunks)?;

    let vectors = embedder.embed(&chunks).await?;
    info!(
        "Embedded resume into {} chunks with {}",
        vectors.len(),
        embedder.model()
    );

    let jobs = search(state.index.as_ref(), &vectors, &request.filters, &options).await?;

    Ok(Json(jobs.into()))
}

/// Each chunk is one index query; keeps a single request's fan-out bounded.
fn check_chunk_count(count: usize, max: usize) -> Result<(), AppError> {
    if count > max {
        return Err(AppError::Validation(format!(
            "resume has {count} chunks, at most {max} are allowed"
        )));
    }
    Ok(())
}

fn resolve_options(
    config: &Config,
    collection: Option<String>,
    limit: Option<usize>,
) -> Result<SearchOptions, AppError> {
    let mut options = SearchOptions::from_config(config);
    if let Some(collection) = collection {
        if collection.trim().is_empty() {
            return Err(AppError::Validation("collection cannot be blank".to_string()));
        }
        options.collection = collection.trim().to_string();
    }
    if let Some(limit) = limit {
        if limit == 0 {
            return Err(AppError::Validation("limit must be at least 1".to_string()));
        }
        options.limit = limit;
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use httpmock::prelude::*;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::embedding::{Embedder, EmbeddingError};
    use crate::index::fake::FakeIndex;
    use crate::index::qdrant::QdrantIndex;
    use crate::models::job::PointId;
    use crate::routes::build_router;

    /// Embeds text as a one-hot vector on its first letter.
    struct LetterEmbedder;

    #[async_trait]
    impl Embedder for LetterEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts
                .iter()
                .map(|t| match t.chars().next() {
                    Some('a') => vec![1.0, 0.0],
                    _ => vec![0.0, 1.0],
                })
                .collect())
        }

        fn model(&self) -> &str {
            "letters"
        }
    }

    fn config() -> Config {
        Config::from_lookup(|_| None).unwrap()
    }

    fn state(index: FakeIndex, embedder: Option<Arc<dyn Embedder>>) -> AppState {
        AppState {
            index: Arc::new(index),
            embedder,
            config: config(),
        }
    }

    fn corpus() -> FakeIndex {
        FakeIndex::new()
            .with_point(
                PointId::canonical("J1"),
                vec![1.0, 0.0],
                json!({"jobTitle": "Analyst", "jobType": "Full-time"}),
            )
            .with_point(
                PointId::canonical("J2"),
                vec![0.0, 1.0],
                json!({"jobTitle": "Engineer", "jobType": "Contract",
                       "locationInfo": {"jobLocationCity": "Irvine"}}),
            )
    }

    async fn post(state: AppState, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = build_router(state)
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_search_endpoint_ranks_jobs() {
        let (status, body) = post(
            state(corpus(), None),
            "/api/v1/jobs/search",
            json!({"resume_vectors": [[0.1, 0.9]]}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["jobs"][0]["jobTitle"], "Engineer");
        assert_eq!(body["jobs"][0]["locationInfo"], "Irvine");
        assert!(body["jobs"][1].get("locationInfo").is_none());
    }

    #[tokio::test]
    async fn test_search_endpoint_applies_filters() {
        let (status, body) = post(
            state(corpus(), None),
            "/api/v1/jobs/search",
            json!({
                "resume_vectors": [[0.1, 0.9]],
                "filters": {"filter_job_type": "Full-time", "filter_unknown": "x"}
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["jobs"][0]["jobKey"], "J1");
    }

    #[tokio::test]
    async fn test_search_endpoint_no_match_is_ok() {
        let (status, body) = post(
            state(corpus(), None),
            "/api/v1/jobs/search",
            json!({"resume_vectors": [[1.0, 0.0]], "filters": {"filter_state": "CA"}}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"jobs": [], "total": 0}));
    }

    #[tokio::test]
    async fn test_search_endpoint_index_down_is_503() {
        let (status, body) = post(
            state(corpus().unreachable(), None),
            "/api/v1/jobs/search",
            json!({"resume_vectors": [[1.0, 0.0]]}),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "RETRIEVAL_ERROR");
        assert_eq!(body["error"]["retryable"], true);
    }

    #[tokio::test]
    async fn test_search_endpoint_rejects_empty_vectors() {
        let (status, _) = post(
            state(corpus(), None),
            "/api/v1/jobs/search",
            json!({"resume_vectors": []}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_endpoint_rejects_zero_limit() {
        let (status, _) = post(
            state(corpus(), None),
            "/api/v1/jobs/search",
            json!({"resume_vectors": [[1.0, 0.0]], "limit": 0}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_endpoint_rejects_mixed_dimensions() {
        let (status, body) = post(
            state(corpus(), None),
            "/api/v1/jobs/search",
            json!({"resume_vectors": [[1.0, 0.0], [1.0, 0.0, 0.0]]}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_search_endpoint_caps_resume_chunks() {
        let index = Arc::new(corpus());
        let app_state = AppState {
            index: index.clone(),
            embedder: None,
            config: config(),
        };
        let vectors: Vec<Vec<f32>> = (0..5000).map(|_| vec![1.0, 0.0]).collect();
        let (status, body) = post(
            app_state,
            "/api/v1/jobs/search",
            json!({ "resume_vectors": vectors }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(index.query_count(), 0);
    }

    #[tokio::test]
    async fn test_search_endpoint_accepts_chunks_up_to_cap() {
        let vectors: Vec<Vec<f32>> = (0..20).map(|_| vec![1.0, 0.0]).collect();
        let (status, _) = post(
            state(corpus(), None),
            "/api/v1/jobs/search",
            json!({ "resume_vectors": vectors }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_match_endpoint_caps_resume_chunks() {
        let embedder: Arc<dyn Embedder> = Arc::new(LetterEmbedder);
        let (status, _) = post(
            state(corpus(), Some(embedder)),
            "/api/v1/jobs/match",
            json!({"resume_text": "a".repeat(DEFAULT_CHUNK_SIZE * 25)}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_endpoint_index_rejection_is_not_retryable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/ds_jobs/points/search/groups");
                then.status(400).json_body(json!({
                    "status": {"error": "Wrong input: Vector dimension error: expected dim: 3072, got 2"},
                    "time": 0.0
                }));
            })
            .await;
        let index =
            QdrantIndex::new(&server.base_url(), None, Duration::from_secs(5)).unwrap();
        let app_state = AppState {
            index: Arc::new(index),
            embedder: None,
            config: config(),
        };

        let (status, body) = post(
            app_state,
            "/api/v1/jobs/search",
            json!({"resume_vectors": [[1.0, 0.0]]}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["retryable"], false);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Vector dimension error"));
    }

    #[tokio::test]
    async fn test_match_endpoint_embeds_resume() {
        let embedder: Arc<dyn Embedder> = Arc::new(LetterEmbedder);
        let (status, body) = post(
            state(corpus(), Some(embedder)),
            "/api/v1/jobs/match",
            json!({"resume_text": "analytics, SQL, dashboards"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["jobs"][0]["jobTitle"], "Analyst");
    }

    #[tokio::test]
    async fn test_match_endpoint_without_embedder_is_503() {
        let (status, body) = post(
            state(corpus(), None),
            "/api/v1/jobs/match",
            json!({"resume_text": "analytics"}),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_match_endpoint_rejects_blank_resume() {
        let embedder: Arc<dyn Embedder> = Arc::new(LetterEmbedder);
        let (status, _) = post(
            state(corpus(), Some(embedder)),
            "/api/v1/jobs/match",
            json!({"resume_text": "   "}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_filter_catalogue() {
        let Json(catalogue) = handle_filter_catalogue().await;
        assert_eq!(
            catalogue.keys,
            vec!["filter_job_type", "filter_state", "filter_city"]
        );
        assert!(catalogue.job_types.contains(&"Full-time"));
    }

    #[test]
    fn test_resolve_options_overrides() {
        let options =
            resolve_options(&config(), Some(" swe_jobs ".to_string()), Some(5)).unwrap();
        assert_eq!(options.collection, "swe_jobs");
        assert_eq!(options.limit, 5);

        let options = resolve_options(&config(), None, None).unwrap();
        assert_eq!(options.collection, "ds_jobs");
        assert_eq!(options.limit, 100);
    }
}
