//! Vector index boundary.
//!
//! The matching pipeline talks to the index only through `VectorIndex`,
//! carried in `AppState` as `Arc<dyn VectorIndex>`. Production uses
//! `QdrantIndex`; tests substitute `fake::FakeIndex`.

use async_trait::async_trait;
use thiserror::Error;

use crate::matching::filter::FilterPredicate;
use crate::models::job::{JobPayload, JobRecord, PointId};

#[cfg(test)]
pub mod fake;
pub mod qdrant;

/// Transport-level failure talking to the index. Fatal for the current request.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Index API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Index response had no result")]
    MissingResult,
}

impl RetrievalError {
    /// Whether the same query may succeed later. A 4xx other than 429 means
    /// the index rejected the query itself.
    pub fn is_transient(&self) -> bool {
        match self {
            RetrievalError::Api { status, .. } => {
                *status == 429 || !(400..500).contains(status)
            }
            _ => true,
        }
    }
}

/// One chunk hit returned by a similarity query. Higher score = more similar.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: PointId,
    pub score: f32,
    pub payload: Option<JobPayload>,
}

/// Hits sharing one value of the grouping field.
#[derive(Debug, Clone, PartialEq)]
pub struct PointGroup {
    pub key: String,
    pub hits: Vec<ScoredPoint>,
}

/// A single similarity query against one collection.
#[derive(Debug, Clone, Copy)]
pub struct SearchRequest<'a> {
    pub collection: &'a str,
    pub vector: &'a [f32],
    pub filter: &'a FilterPredicate,
    pub limit: usize,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Flat similarity search: up to `limit` chunk hits, best first.
    async fn search(&self, request: SearchRequest<'_>) -> Result<Vec<ScoredPoint>, RetrievalError>;

    /// Grouped similarity search: up to `limit` groups keyed by `group_by`,
    /// each carrying up to `group_size` of its best hits.
    async fn search_groups(
        &self,
        request: SearchRequest<'_>,
        group_by: &str,
        group_size: usize,
    ) -> Result<Vec<PointGroup>, RetrievalError>;

    /// Fetches full records by point id. The output is aligned with `ids`;
    /// `None` marks an id the index could not return.
    async fn retrieve(
        &self,
        collection: &str,
        ids: &[PointId],
    ) -> Result<Vec<Option<JobRecord>>, RetrievalError>;

    /// Whether `search_groups` is available natively.
    fn supports_grouping(&self) -> bool {
        true
    }
}
