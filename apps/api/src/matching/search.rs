//! Search pipeline: filter → chunk scoring → aggregation → ranking →
//! retrieval → display formatting.

use tracing::info;

use crate::config::Config;
use crate::index::{RetrievalError, VectorIndex};
use crate::matching::aggregate::aggregate;
use crate::matching::filter::{build_filter, FilterOptions};
use crate::matching::format::{format_record, JobCard};
use crate::matching::rank::{fetch, rank};
use crate::matching::scorer::{score_chunks, ScoreParams};

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub collection: String,
    /// Per-query result cap, also the cap on the final list.
    pub limit: usize,
    pub group_by: String,
    pub group_size: usize,
    /// Query with every resume chunk instead of only the first.
    pub multi_chunk: bool,
}

impl SearchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            collection: config.job_collection.clone(),
            limit: config.search_limit,
            group_by: config.group_by_field.clone(),
            group_size: config.group_size,
            multi_chunk: config.multi_chunk_search,
        }
    }
}

/// Ranks the indexed jobs against a resume's chunk vectors.
///
/// An empty result is a valid "no match" outcome. An unreachable index is
/// an error, so callers can tell the two apart.
pub async fn search(
    index: &dyn VectorIndex,
    resume_vectors: &[Vec<f32>],
    filter_options: &FilterOptions,
    options: &SearchOptions,
) -> Result<Vec<JobCard>, RetrievalError> {
    let predicate = build_filter(filter_options);
    let vectors = if options.multi_chunk {
        resume_vectors
    } else {
        &resume_vectors[..resume_vectors.len().min(1)]
    };

    let params = ScoreParams {
        collection: &options.collection,
        top_k: options.limit,
        group_by: &options.group_by,
        group_size: options.group_size,
    };
    let hits = score_chunks(index, vectors, &predicate, params).await?;
    let aggregated = aggregate(&hits);
    if aggregated.is_empty() {
        info!(
            "Search over '{}': no jobs matched ({} queries)",
            options.collection,
            vectors.len()
        );
        return Ok(Vec::new());
    }

    let mut ranked = rank(&aggregated);
    ranked.truncate(options.limit);

    let outcome = fetch(index, &options.collection, &ranked).await?;

    info!(
        "Search over '{}': {} queries, {} chunk hits, {} jobs ranked, {} returned, {} dropped",
        options.collection,
        vectors.len(),
        hits.len(),
        aggregated.len(),
        outcome.records.len(),
        outcome.missing.len()
    );

    Ok(outcome
        .records
        .iter()
        .map(|(score, record)| {
            let mut card = format_record(record);
            card.match_score = Some(score.best_score);
            card
        })
        .collect())
}
