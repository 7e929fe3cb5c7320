//! Records read from the store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use mcat_core::{Guid, RunDescription, RunId};
use serde::{Deserialize, Serialize};

/// One row of the `runs` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub exp_id: i64,
    pub guid: Guid,
    pub name: Option<String>,
    pub result_table_name: String,
    pub run_timestamp: Option<DateTime<Utc>>,
    pub completed_timestamp: Option<DateTime<Utc>>,
    /// Raw description document as stored.
    pub run_description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentInfo {
    pub name: String,
    pub sample_name: String,
}

/// What is needed to fetch a run's parameter data.
#[derive(Debug, Clone, PartialEq)]
pub struct RunLayout {
    pub description: RunDescription,
    pub table_name: String,
}

/// Dataset-level facts about one run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub number_of_results: u64,
    /// User metadata columns attached to the run row.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<serde_json::Value>,
}

/// Convert a stored unix timestamp (seconds, fractional) to UTC.
pub fn timestamp_from_unix(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    DateTime::<Utc>::from_timestamp_millis((seconds * 1000.0).round() as i64)
}
