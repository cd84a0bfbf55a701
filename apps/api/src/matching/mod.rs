// Resume-to-job matching: filter building, per-chunk similarity scoring,
// max-score aggregation per job, stable ranking and display formatting.
// All index access goes through `index::VectorIndex`.

pub mod aggregate;
pub mod filter;
pub mod format;
pub mod handlers;
pub mod rank;
pub mod scorer;
pub mod search;
