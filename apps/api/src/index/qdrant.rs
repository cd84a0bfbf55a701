//! Qdrant REST client implementing `VectorIndex`.
//!
//! Read-only: search, grouped search and point retrieval. Retries are left
//! to the caller; every transport failure surfaces as a `RetrievalError`.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{PointGroup, RetrievalError, ScoredPoint, SearchRequest, VectorIndex};
use crate::matching::filter::FilterPredicate;
use crate::models::job::{JobPayload, JobRecord, PointId};

/// Shared, long-lived Qdrant client. Cheap to clone; connection pooling is
/// handled by `reqwest`.
#[derive(Clone)]
pub struct QdrantIndex {
    client: Client,
    base_url: String,
}

impl QdrantIndex {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        anyhow::ensure!(
            base_url.starts_with("http://") || base_url.starts_with("https://"),
            "Qdrant URL must be an http(s) URL"
        );
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
            headers.insert(
                "api-key",
                HeaderValue::from_str(key).context("invalid Qdrant API key")?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Qdrant HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn points_url(&self, collection: &str, suffix: &str) -> String {
        format!("{}/collections/{}/points{}", self.base_url, collection, suffix)
    }

    async fn post<B, T>(&self, url: &str, body: &B) -> Result<T, RetrievalError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<QdrantError>(&body)
                .ok()
                .and_then(|e| e.status.error)
                .unwrap_or(body);
            warn!("Qdrant returned {status} for {url}: {message}");
            return Err(RetrievalError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        let envelope: QdrantResponse<T> = serde_json::from_slice(&bytes)?;
        envelope.result.ok_or(RetrievalError::MissingResult)
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn search(&self, request: SearchRequest<'_>) -> Result<Vec<ScoredPoint>, RetrievalError> {
        let body = SearchBody {
            vector: request.vector,
            filter: WireFilter::from_predicate(request.filter),
            limit: request.limit,
            with_payload: true,
        };
        let url = self.points_url(request.collection, "/search");
        let hits: Vec<WirePoint> = self.post(&url, &body).await?;
        debug!("Qdrant search on '{}' returned {} hits", request.collection, hits.len());
        Ok(hits.into_iter().map(WirePoint::into_scored).collect())
    }

    async fn search_groups(
        &self,
        request: SearchRequest<'_>,
        group_by: &str,
        group_size: usize,
    ) -> Result<Vec<PointGroup>, RetrievalError> {
        let body = GroupSearchBody {
            vector: request.vector,
            filter: WireFilter::from_predicate(request.filter),
            group_by,
            limit: request.limit,
            group_size: group_size.max(1),
            with_payload: true,
        };
        let url = self.points_url(request.collection, "/search/groups");
        let result: WireGroups = self.post(&url, &body).await?;
        debug!(
            "Qdrant grouped search on '{}' returned {} groups",
            request.collection,
            result.groups.len()
        );
        Ok(result
            .groups
            .into_iter()
            .map(|group| PointGroup {
                key: group.id.to_string(),
                hits: group.hits.into_iter().map(WirePoint::into_scored).collect(),
            })
            .collect())
    }

    async fn retrieve(
        &self,
        collection: &str,
        ids: &[PointId],
    ) -> Result<Vec<Option<JobRecord>>, RetrievalError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let body = RetrieveBody {
            ids,
            with_payload: true,
            with_vector: false,
        };
        let url = self.points_url(collection, "");
        let records: Vec<WireRecord> = self.post(&url, &body).await?;

        let mut by_id: HashMap<PointId, JobRecord> = HashMap::with_capacity(records.len());
        for record in records {
            let Some(payload) = record.payload.and_then(|p| parse_payload(&record.id, p)) else {
                continue;
            };
            by_id.insert(
                record.id.clone(),
                JobRecord {
                    id: record.id,
                    payload,
                },
            );
        }

        Ok(ids.iter().map(|id| by_id.get(id).cloned()).collect())
    }
}

fn parse_payload(id: &PointId, payload: Value) -> Option<JobPayload> {
    match serde_json::from_value(payload) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!("Discarding unreadable payload for point {id}: {e}");
            None
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct WireFilter<'a> {
    must: Vec<WireCondition<'a>>,
}

impl<'a> WireFilter<'a> {
    fn from_predicate(predicate: &'a FilterPredicate) -> Option<Self> {
        if predicate.is_empty() {
            return None;
        }
        Some(Self {
            must: predicate
                .conditions()
                .iter()
                .map(|c| WireCondition {
                    key: c.key,
                    matches: WireMatch { value: &c.value },
                })
                .collect(),
        })
    }
}

#[derive(Debug, Serialize)]
struct WireCondition<'a> {
    key: &'a str,
    #[serde(rename = "match")]
    matches: WireMatch<'a>,
}

#[derive(Debug, Serialize)]
struct WireMatch<'a> {
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    vector: &'a [f32],
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<WireFilter<'a>>,
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Serialize)]
struct GroupSearchBody<'a> {
    vector: &'a [f32],
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<WireFilter<'a>>,
    group_by: &'a str,
    limit: usize,
    group_size: usize,
    with_payload: bool,
}

#[derive(Debug, Serialize)]
struct RetrieveBody<'a> {
    ids: &'a [PointId],
    with_payload: bool,
    with_vector: bool,
}

#[derive(Debug, Deserialize)]
struct QdrantResponse<T> {
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct QdrantError {
    status: QdrantErrorStatus,
}

#[derive(Debug, Deserialize)]
struct QdrantErrorStatus {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePoint {
    id: PointId,
    score: f32,
    #[serde(default)]
    payload: Option<Value>,
}

impl WirePoint {
    fn into_scored(self) -> ScoredPoint {
        let payload = self.payload.and_then(|p| parse_payload(&self.id, p));
        ScoredPoint {
            id: self.id,
            score: self.score,
            payload,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireGroups {
    groups: Vec<WireGroup>,
}

#[derive(Debug, Deserialize)]
struct WireGroup {
    id: PointId,
    hits: Vec<WirePoint>,
}

#[derive(Debug, Deserialize)]
struct WireRecord {
    id: PointId,
    #[serde(default)]
    payload: Option<Value>,
}
