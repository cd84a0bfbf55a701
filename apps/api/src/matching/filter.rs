//! Filter Builder: turns the UI filter options into an index predicate.
//!
//! Only present, non-blank options constrain the search, and all of them
//! must hold. Unknown option keys are ignored so older clients keep working
//! when new filters are added.

use serde::{Deserialize, Serialize};

#[cfg(test)]
use crate::models::job::JobPayload;

/// Colloquial city names mapped to the form stored in the index.
const CITY_ALIASES: &[(&str, &str)] = &[("Bay Area", "San Francisco Bay Area")];

/// Job types offered by the UI job-type selector.
pub const JOB_TYPES: &[&str] = &[
    "Full-time",
    "Part-time",
    "Contract",
    "Internship",
    "Seasonal",
    "Temporary",
    "Non-tenure",
    "PRN",
    "Per diem",
    "Temp-to-hire",
    "Travel healthcare",
    "Permanent",
    "Tenure track",
    "Apprenticeship",
    "Tenured",
];

/// Recognized filter option keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterKey {
    #[serde(rename = "filter_job_type")]
    JobType,
    #[serde(rename = "filter_state")]
    State,
    #[serde(rename = "filter_city")]
    City,
}

impl FilterKey {
    pub const ALL: [FilterKey; 3] = [FilterKey::JobType, FilterKey::State, FilterKey::City];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKey::JobType => "filter_job_type",
            FilterKey::State => "filter_state",
            FilterKey::City => "filter_city",
        }
    }

    /// Payload path this key constrains.
    pub fn field(&self) -> &'static str {
        match self {
            FilterKey::JobType => "jobType",
            FilterKey::State => "locationInfo.jobLocationState",
            FilterKey::City => "locationInfo.jobLocationCity",
        }
    }
}

/// User-facing filter options as sent by the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    #[serde(default)]
    pub filter_job_type: Option<String>,
    #[serde(default)]
    pub filter_state: Option<String>,
    #[serde(default)]
    pub filter_city: Option<String>,
}

impl FilterOptions {
    pub fn get(&self, key: FilterKey) -> Option<&str> {
        match key {
            FilterKey::JobType => self.filter_job_type.as_deref(),
            FilterKey::State => self.filter_state.as_deref(),
            FilterKey::City => self.filter_city.as_deref(),
        }
    }
}

/// One exact-match constraint on a payload field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldCondition {
    pub key: &'static str,
    pub value: String,
}

/// Conjunction of exact-match constraints. Empty means "match everything".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterPredicate {
    must: Vec<FieldCondition>,
}

impl FilterPredicate {
    pub fn conditions(&self) -> &[FieldCondition] {
        &self.must
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
    }

    /// Value a field is constrained to, if any.
    #[cfg(test)]
    pub fn constraint(&self, field: &str) -> Option<&str> {
        self.must
            .iter()
            .find(|c| c.key == field)
            .map(|c| c.value.as_str())
    }

    /// Evaluates the predicate in-process, as the test index does.
    #[cfg(test)]
    pub fn matches(&self, payload: &JobPayload) -> bool {
        self.must
            .iter()
            .all(|c| payload.field(c.key) == Some(c.value.as_str()))
    }
}

/// Builds the index predicate for a set of filter options.
pub fn build_filter(options: &FilterOptions) -> FilterPredicate {
    let must = FilterKey::ALL
        .into_iter()
        .filter_map(|key| {
            let value = options.get(key)?.trim();
            if value.is_empty() {
                return None;
            }
            let value = match key {
                FilterKey::City => canonical_city(value),
                _ => value,
            };
            Some(FieldCondition {
                key: key.field(),
                value: value.to_string(),
            })
        })
        .collect();

    FilterPredicate { must }
}

fn canonical_city(city: &str) -> &str {
    CITY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == city)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(city)
}
