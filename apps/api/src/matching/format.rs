//! Result Formatter: projects stored job records into display cards.
//!
//! Projection is sparse. A field that is missing, null, false, zero or empty
//! is left out of the card entirely, so clients treat an absent key as
//! "unknown". Only the empty string is empty; whitespace is kept as stored.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::models::job::{JobRecord, LocationInfo, RemoteWorkInfo};

const PREVIEW_CHARS: usize = 300;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCard {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_work_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

pub fn format_record(record: &JobRecord) -> JobCard {
    let payload = &record.payload;
    let job_description = present(payload.job_description.as_deref());

    JobCard {
        job_key: present(payload.job_key()),
        job_title: present(payload.job_title.as_deref()),
        company_name: present(payload.company_name.as_deref()),
        job_type: present(payload.job_type.as_deref()),
        job_link: present(payload.job_link.as_deref()),
        location_info: payload.location_info.as_ref().and_then(location_label),
        remote_work_info: payload.remote_work_info.as_ref().and_then(remote_label),
        salary_snippet: present(payload.salary_snippet.as_deref()),
        description_preview: job_description
            .as_deref()
            .map(|d| description_preview(d, PREVIEW_CHARS)),
        job_description,
        match_score: None,
        extra: payload
            .extra
            .iter()
            .filter(|(_, v)| is_truthy(v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

/// `"City, State"`, or whichever half is present.
pub fn location_label(info: &LocationInfo) -> Option<String> {
    let city = present(info.job_location_city.as_deref());
    let state = present(info.job_location_state.as_deref());
    match (city, state) {
        (Some(city), Some(state)) => Some(format!("{city}, {state}")),
        (city, state) => city.or(state),
    }
}

/// Descriptive text preferred over the bare remote type.
pub fn remote_label(info: &RemoteWorkInfo) -> Option<String> {
    present(info.text.as_deref()).or_else(|| present(info.kind.as_deref()))
}

/// First `max_chars` characters, with `...` appended when truncated.
pub fn description_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn present(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
