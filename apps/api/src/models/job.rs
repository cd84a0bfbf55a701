//! Job posting records as stored in the vector index.
//!
//! Payloads arrive as loosely-typed JSON. Every field is optional and parsed
//! leniently: a field with an unexpected shape becomes `None` instead of
//! failing the whole record, so downstream code never sees raw maps.

use std::collections::BTreeMap;
use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ────────────────────────────────────────────────────────────────────────────
// Point ids
// ────────────────────────────────────────────────────────────────────────────

/// Identifier of one stored vector (one chunk of a job description).
///
/// Chunk ids are reproducible from `(jobKey, ordinal)`, so re-ingesting the
/// same posting overwrites its points instead of duplicating them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Str(String),
}

impl PointId {
    /// Id of the `ordinal`-th chunk of a posting that was split.
    #[cfg(test)]
    pub fn for_chunk(job_key: &str, ordinal: usize) -> Self {
        PointId::Str(format!("{job_key}-{ordinal}"))
    }

    /// Id of a posting that fit in a single chunk.
    #[cfg(test)]
    pub fn canonical(job_key: &str) -> Self {
        PointId::Str(job_key.to_string())
    }

    /// Recovers the job key by stripping a trailing `-<ordinal>` suffix.
    /// Ids without such a suffix are their own job key.
    pub fn job_key(&self) -> String {
        match self {
            PointId::Num(n) => n.to_string(),
            PointId::Str(s) => match s.rsplit_once('-') {
                Some((prefix, ordinal))
                    if !prefix.is_empty()
                        && !ordinal.is_empty()
                        && ordinal.bytes().all(|b| b.is_ascii_digit()) =>
                {
                    prefix.to_string()
                }
                _ => s.clone(),
            },
        }
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointId::Num(n) => write!(f, "{n}"),
            PointId::Str(s) => f.write_str(s),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Payload schema
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInfo {
    #[serde(default, alias = "city", deserialize_with = "lenient")]
    pub job_location_city: Option<String>,
    #[serde(default, alias = "state", deserialize_with = "lenient")]
    pub job_location_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteWorkInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub text: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: Option<String>,
}

/// Stored fields of one job chunk. Unknown fields are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub job_key: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub job_link: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub location_info: Option<LocationInfo>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub remote_work_info: Option<RemoteWorkInfo>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub salary_snippet: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl JobPayload {
    /// Job key from the payload. Older ingestions stored it as `jobkey`.
    pub fn job_key(&self) -> Option<&str> {
        self.job_key
            .as_deref()
            .or_else(|| self.extra.get("jobkey").and_then(Value::as_str))
            .filter(|k| !k.trim().is_empty())
    }

    /// Looks up a string field by its index path (e.g. `locationInfo.jobLocationCity`).
    pub fn field(&self, path: &str) -> Option<&str> {
        match path {
            "jobKey" => self.job_key(),
            "jobTitle" => self.job_title.as_deref(),
            "companyName" => self.company_name.as_deref(),
            "jobType" => self.job_type.as_deref(),
            "jobLink" => self.job_link.as_deref(),
            "jobDescription" => self.job_description.as_deref(),
            "salarySnippet" => self.salary_snippet.as_deref(),
            "locationInfo.jobLocationCity" => self
                .location_info
                .as_ref()
                .and_then(|l| l.job_location_city.as_deref()),
            "locationInfo.jobLocationState" => self
                .location_info
                .as_ref()
                .and_then(|l| l.job_location_state.as_deref()),
            "remoteWorkInfo.text" => self.remote_work_info.as_ref().and_then(|r| r.text.as_deref()),
            "remoteWorkInfo.type" => self.remote_work_info.as_ref().and_then(|r| r.kind.as_deref()),
            other => {
                let mut parts = other.split('.');
                let mut value = self.extra.get(parts.next()?)?;
                for part in parts {
                    value = value.get(part)?;
                }
                value.as_str()
            }
        }
    }
}

/// A full stored record returned by point-id retrieval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub id: PointId,
    pub payload: JobPayload,
}

/// Accepts any JSON value and keeps it only if it fits `T`.
/// Numbers are accepted where strings are expected.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let value = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => serde_json::from_value(Value::Number(n.clone()))
            .or_else(|_| serde_json::from_value(Value::String(n.to_string()))),
        other => serde_json::from_value(other),
    };
    Ok(value.ok())
}
