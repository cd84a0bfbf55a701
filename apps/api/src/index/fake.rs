//! In-memory `VectorIndex` for tests: cosine scoring, predicate evaluation,
//! optional native grouping and injectable failures.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use super::{PointGroup, RetrievalError, ScoredPoint, SearchRequest, VectorIndex};
use crate::models::job::{JobPayload, JobRecord, PointId};

struct StoredPoint {
    id: PointId,
    vector: Vec<f32>,
    payload: JobPayload,
}

#[derive(Default)]
pub struct FakeIndex {
    points: Vec<StoredPoint>,
    flat_only: bool,
    unreachable: bool,
    lost: HashSet<PointId>,
    queries: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores one chunk of a posting. The payload's `jobKey` is filled in.
    pub fn with_point(mut self, id: PointId, vector: Vec<f32>, payload: Value) -> Self {
        let mut payload: JobPayload =
            serde_json::from_value(payload).unwrap_or_default();
        if payload.job_key.is_none() {
            payload.job_key = Some(id.job_key());
        }
        self.points.push(StoredPoint { id, vector, payload });
        self
    }

    /// Disables `search_groups`, forcing flat queries.
    pub fn flat_only(mut self) -> Self {
        self.flat_only = true;
        self
    }

    /// Every call fails as if the index were down.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// The point is searchable but `retrieve` reports it missing.
    pub fn losing(mut self, id: PointId) -> Self {
        self.lost.insert(id);
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Most similarity queries that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Counts a query and yields once while it is in flight, so concurrent
    /// callers overlap.
    async fn enter_query(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<(), RetrievalError> {
        if self.unreachable {
            return Err(RetrievalError::Api {
                status: 503,
                message: "index unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn ranked(&self, request: &SearchRequest<'_>) -> Vec<ScoredPoint> {
        let mut hits: Vec<ScoredPoint> = self
            .points
            .iter()
            .filter(|p| request.filter.matches(&p.payload))
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: cosine(request.vector, &p.vector),
                payload: Some(p.payload.clone()),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits
    }
}

#[async_trait]
impl VectorIndex for FakeIndex {
    async fn search(&self, request: SearchRequest<'_>) -> Result<Vec<ScoredPoint>, RetrievalError> {
        self.check_reachable()?;
        self.enter_query().await;
        let mut hits = self.ranked(&request);
        hits.truncate(request.limit);
        Ok(hits)
    }

    async fn search_groups(
        &self,
        request: SearchRequest<'_>,
        group_by: &str,
        group_size: usize,
    ) -> Result<Vec<PointGroup>, RetrievalError> {
        self.check_reachable()?;
        self.enter_query().await;
        let mut groups: Vec<PointGroup> = Vec::new();
        for hit in self.ranked(&request) {
            let Some(key) = hit
                .payload
                .as_ref()
                .and_then(|p| p.field(group_by))
                .map(str::to_string)
            else {
                continue;
            };
            if let Some(group) = groups.iter_mut().find(|g| g.key == key) {
                if group.hits.len() < group_size {
                    group.hits.push(hit);
                }
            } else if groups.len() < request.limit {
                groups.push(PointGroup {
                    key,
                    hits: vec![hit],
                });
            }
        }
        Ok(groups)
    }

    async fn retrieve(
        &self,
        _collection: &str,
        ids: &[PointId],
    ) -> Result<Vec<Option<JobRecord>>, RetrievalError> {
        self.check_reachable()?;
        Ok(ids
            .iter()
            .map(|id| {
                if self.lost.contains(id) {
                    return None;
                }
                self.points.iter().find(|p| &p.id == id).map(|p| JobRecord {
                    id: p.id.clone(),
                    payload: p.payload.clone(),
                })
            })
            .collect())
    }

    fn supports_grouping(&self) -> bool {
        !self.flat_only
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
