//! Chunk Scorer: one similarity query per resume chunk, flattened into
//! `(jobKey, chunkPointId, score)` hits.
//!
//! Grouped queries are used whenever the index supports them. Otherwise the
//! scorer runs a flat query and groups locally, taking the job key from the
//! payload or, failing that, from the point id suffix.

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, warn};

use crate::index::{RetrievalError, ScoredPoint, SearchRequest, VectorIndex};
use crate::matching::filter::FilterPredicate;
use crate::models::job::PointId;

/// A single chunk-level similarity hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkHit {
    pub job_key: String,
    pub chunk_id: PointId,
    pub score: f32,
}

impl ChunkHit {
    pub fn new(job_key: impl Into<String>, chunk_id: PointId, score: f32) -> Self {
        Self {
            job_key: job_key.into(),
            chunk_id,
            score,
        }
    }
}

/// Query parameters shared by every per-chunk query of one search.
#[derive(Debug, Clone, Copy)]
pub struct ScoreParams<'a> {
    pub collection: &'a str,
    pub top_k: usize,
    pub group_by: &'a str,
    pub group_size: usize,
}

/// Most per-chunk queries in flight against the index at once.
pub const MAX_CONCURRENT_QUERIES: usize = 4;

/// Runs one query per resume vector, at most `MAX_CONCURRENT_QUERIES` at a
/// time, and concatenates the hits in resume-chunk order. Any transport
/// failure fails the whole call.
pub async fn score_chunks(
    index: &dyn VectorIndex,
    resume_vectors: &[Vec<f32>],
    predicate: &FilterPredicate,
    params: ScoreParams<'_>,
) -> Result<Vec<ChunkHit>, RetrievalError> {
    let grouped = index.supports_grouping();
    let queries = (0..resume_vectors.len()).map(|chunk| {
        let vector = &resume_vectors[chunk];
        let request = SearchRequest {
            collection: params.collection,
            vector,
            filter: predicate,
            limit: params.top_k,
        };
        async move {
            let hits = if grouped {
                grouped_query(index, request, params).await?
            } else {
                flat_query(index, request, params.group_by).await?
            };
            debug!("Resume chunk {chunk} matched {} job chunks", hits.len());
            Ok::<_, RetrievalError>(hits)
        }
    });

    let per_chunk: Vec<Vec<ChunkHit>> = stream::iter(queries)
        .buffered(MAX_CONCURRENT_QUERIES)
        .try_collect()
        .await?;
    Ok(per_chunk.into_iter().flatten().collect())
}

async fn grouped_query(
    index: &dyn VectorIndex,
    request: SearchRequest<'_>,
    params: ScoreParams<'_>,
) -> Result<Vec<ChunkHit>, RetrievalError> {
    let groups = index
        .search_groups(request, params.group_by, params.group_size.max(1))
        .await?;

    Ok(groups
        .into_iter()
        .flat_map(|group| {
            let key = group.key;
            group
                .hits
                .into_iter()
                .filter(is_finite)
                .map(move |hit| ChunkHit::new(key.clone(), hit.id, hit.score))
        })
        .collect())
}

async fn flat_query(
    index: &dyn VectorIndex,
    request: SearchRequest<'_>,
    group_by: &str,
) -> Result<Vec<ChunkHit>, RetrievalError> {
    let hits = index.search(request).await?;
    Ok(hits
        .into_iter()
        .filter(is_finite)
        .map(|hit| {
            let job_key = local_group_key(&hit, group_by);
            ChunkHit::new(job_key, hit.id, hit.score)
        })
        .collect())
}

/// Group key for a flat hit: the payload's `group_by` field first, point id
/// suffix stripping second.
fn local_group_key(hit: &ScoredPoint, group_by: &str) -> String {
    hit.payload
        .as_ref()
        .and_then(|p| p.field(group_by))
        .map(str::to_string)
        .unwrap_or_else(|| hit.id.job_key())
}

fn is_finite(hit: &ScoredPoint) -> bool {
    if hit.score.is_finite() {
        return true;
    }
    warn!("Skipping point {} with non-finite score {}", hit.id, hit.score);
    false
}
