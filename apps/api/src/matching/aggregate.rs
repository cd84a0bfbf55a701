//! Aggregator: collapses chunk-level hits into one best score per job.
//!
//! A job's score is the maximum over its chunks. Among chunks tied at the
//! maximum, the first one seen in the hit sequence wins.

use std::collections::HashMap;

use serde::Serialize;

use crate::matching::scorer::ChunkHit;
use crate::models::job::PointId;

/// Best chunk of one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobScore {
    pub job_key: String,
    pub best_chunk_id: PointId,
    pub best_score: f32,
}

/// Job key → best chunk, iterated in order of each job's first appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregated {
    entries: Vec<JobScore>,
    positions: HashMap<String, usize>,
}

impl Aggregated {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, job_key: &str) -> Option<&JobScore> {
        self.positions.get(job_key).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, JobScore> {
        self.entries.iter()
    }

    fn offer(&mut self, hit: &ChunkHit) {
        match self.positions.get(&hit.job_key).copied() {
            Some(i) => {
                let best = &mut self.entries[i];
                if hit.score > best.best_score {
                    best.best_score = hit.score;
                    best.best_chunk_id = hit.chunk_id.clone();
                }
            }
            None => {
                self.positions.insert(hit.job_key.clone(), self.entries.len());
                self.entries.push(JobScore {
                    job_key: hit.job_key.clone(),
                    best_chunk_id: hit.chunk_id.clone(),
                    best_score: hit.score,
                });
            }
        }
    }
}

impl<'a> IntoIterator for &'a Aggregated {
    type Item = &'a JobScore;
    type IntoIter = std::slice::Iter<'a, JobScore>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

pub fn aggregate(hits: &[ChunkHit]) -> Aggregated {
    let mut aggregated = Aggregated::default();
    for hit in hits {
        aggregated.offer(hit);
    }
    aggregated
}
