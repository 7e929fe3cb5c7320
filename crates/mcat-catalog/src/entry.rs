//! Per-run catalog entries.

use std::path::Path;

use chrono::{DateTime, Utc};
use mcat_core::{Guid, RunDescription, RunId, classify};
use mcat_store::{ExperimentInfo, RunRecord};
use serde::{Deserialize, Serialize};

use crate::error::CatalogResult;

/// Metadata attached to every entry, under fixed keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub start_time: Option<DateTime<Utc>>,
    pub stop_time: Option<DateTime<Utc>>,
    pub dependent_parameters: Vec<String>,
    pub independent_parameters: Vec<String>,
    pub experiment_name: String,
    pub sample_name: String,
    pub table_name: String,
}

impl EntryMetadata {
    pub fn from_run(record: &RunRecord, experiment: &ExperimentInfo) -> CatalogResult<Self> {
        let description = RunDescription::from_json(&record.run_description)?;
        let (dependent_parameters, independent_parameters) = classify(&description);
        Ok(Self {
            start_time: record.run_timestamp,
            stop_time: record.completed_timestamp,
            dependent_parameters,
            independent_parameters,
            experiment_name: experiment.name.clone(),
            sample_name: experiment.sample_name.clone(),
            table_name: record.result_table_name.clone(),
        })
    }
}

/// One run as listed by a loaded catalog. Never mutated after load.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub guid: Guid,
    pub run_id: RunId,
    pub description: String,
    pub metadata: EntryMetadata,
}

impl CatalogEntry {
    pub(crate) fn new(guid: Guid, run_id: RunId, db_path: &Path, metadata: EntryMetadata) -> Self {
        let description = format!("run {} at {}", guid, db_path.display());
        Self {
            guid,
            run_id,
            description,
            metadata,
        }
    }
}
