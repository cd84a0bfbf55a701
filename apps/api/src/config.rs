use std::str::FromStr;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if a value is present but malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    /// Without a key, `/api/v1/jobs/match` is unavailable; `/search` still works.
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub embedding_model: String,
    pub job_collection: String,
    pub search_limit: usize,
    pub group_by_field: String,
    pub group_size: usize,
    pub multi_chunk_search: bool,
    /// Most resume chunks one request may query with.
    pub max_resume_chunks: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let search_limit: usize = parse_or(&get, "SEARCH_LIMIT", 100)?;
        anyhow::ensure!(search_limit > 0, "SEARCH_LIMIT must be at least 1");
        let max_resume_chunks: usize = parse_or(&get, "MAX_RESUME_CHUNKS", 20)?;
        anyhow::ensure!(max_resume_chunks > 0, "MAX_RESUME_CHUNKS must be at least 1");

        Ok(Config {
            qdrant_url: or_default("QDRANT_URL", "http://localhost:6333"),
            qdrant_api_key: get("QDRANT_API_KEY"),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: or_default("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            embedding_model: or_default("EMBEDDING_MODEL", "text-embedding-3-large"),
            job_collection: or_default("JOB_COLLECTION", "ds_jobs"),
            search_limit,
            group_by_field: or_default("GROUP_BY_FIELD", "jobKey"),
            group_size: parse_or::<usize, _>(&get, "GROUP_SIZE", 3)?.max(1),
            multi_chunk_search: parse_or(&get, "MULTI_CHUNK_SEARCH", true)?,
            max_resume_chunks,
            port: parse_or(&get, "PORT", 8080)
                .context("PORT must be a valid port number")?,
            rust_log: or_default("RUST_LOG", "info"),
        })
    }
}

fn parse_or<T, F>(get: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'")),
        None => Ok(default),
    }
}
