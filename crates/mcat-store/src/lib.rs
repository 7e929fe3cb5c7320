//! mcat-store: read access to the SQLite measurement store.

pub mod npy;
pub mod sqlite;
pub mod store;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use sqlite::SqliteStore;
pub use store::MeasurementStore;
pub use types::*;

use mcat_core::{Guid, RunId};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database file not found: {path}")]
    DatabaseNotFound { path: std::path::PathBuf },

    #[error("Run not found: run_id {run_id}")]
    RunIdNotFound { run_id: RunId },

    #[error("Run not found: guid {guid}")]
    GuidNotFound { guid: Guid },

    #[error("Experiment not found: exp_id {exp_id}")]
    ExperimentNotFound { exp_id: i64 },

    #[error("Malformed .npy blob in column {column}: {source}")]
    Npy {
        column: String,
        #[source]
        source: npy::NpyError,
    },

    #[error("Malformed blob in column {column}: {reason}")]
    MalformedBlob { column: String, reason: String },

    #[error("Malformed snapshot for run {run_id}: {reason}")]
    MalformedSnapshot { run_id: RunId, reason: String },

    #[error("Unknown column {column} in table {table}")]
    UnknownColumn { table: String, column: String },

    #[error(transparent)]
    Core(#[from] mcat_core::CoreError),
}
