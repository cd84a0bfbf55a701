//! Ranker: orders jobs by best score and fetches their stored records.

use std::cmp::Ordering;

use tracing::warn;

use crate::index::{RetrievalError, VectorIndex};
use crate::matching::aggregate::{Aggregated, JobScore};
use crate::models::job::{JobRecord, PointId};

/// Sorts jobs by best score, descending. Equal scores keep the aggregation
/// order (stable sort), so identical inputs always rank identically.
pub fn rank(aggregated: &Aggregated) -> Vec<JobScore> {
    let mut ranked: Vec<JobScore> = aggregated.iter().cloned().collect();
    ranked.sort_by(|a, b| {
        b.best_score
            .partial_cmp(&a.best_score)
            .unwrap_or(Ordering::Equal)
    });
    ranked
}

/// Ranked jobs paired with their stored records.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub records: Vec<(JobScore, JobRecord)>,
    /// Job keys whose record could not be retrieved, in rank order.
    pub missing: Vec<String>,
}

/// Retrieves the full record of each ranked job by its best chunk id (the
/// canonical id for single-chunk postings). Records the index cannot return
/// are dropped with a warning; the rest keep their rank order.
pub async fn fetch(
    index: &dyn VectorIndex,
    collection: &str,
    ranked: &[JobScore],
) -> Result<FetchOutcome, RetrievalError> {
    if ranked.is_empty() {
        return Ok(FetchOutcome::default());
    }

    let ids: Vec<PointId> = ranked.iter().map(|s| s.best_chunk_id.clone()).collect();
    let mut retrieved = index.retrieve(collection, &ids).await?.into_iter();

    let mut outcome = FetchOutcome::default();
    for score in ranked {
        match retrieved.next().flatten() {
            Some(record) => outcome.records.push((score.clone(), record)),
            None => {
                warn!(
                    "Dropping job {} from results: record {} could not be retrieved",
                    score.job_key, score.best_chunk_id
                );
                outcome.missing.push(score.job_key.clone());
            }
        }
    }

    Ok(outcome)
}
