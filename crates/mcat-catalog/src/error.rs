//! Error types for the catalog facade.

use std::path::PathBuf;

use mcat_core::CoreError;
use mcat_data::DataError;
use mcat_store::StoreError;

/// Catalog error type that folds the errors of the store, data and core
/// crates into the categories callers act on.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Catalog is not loaded: {operation} requires load()")]
    NotInitialized { operation: &'static str },

    #[error("Inconsistent shapes: {0}")]
    InconsistentShapes(String),

    #[error("Malformed run description: {0}")]
    MalformedDescription(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Failed to read config file: {path}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

impl From<CoreError> for CatalogError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidGuid { .. } => CatalogError::Configuration(err.to_string()),
            CoreError::ArrayShape { .. } => CatalogError::InconsistentShapes(err.to_string()),
            CoreError::MalformedDescription { .. }
            | CoreError::DescriptionJson(_)
            | CoreError::UnsupportedVersion { .. } => {
                CatalogError::MalformedDescription(err.to_string())
            }
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Core(inner) => inner.into(),
            StoreError::RunIdNotFound { .. }
            | StoreError::GuidNotFound { .. }
            | StoreError::ExperimentNotFound { .. }
            | StoreError::DatabaseNotFound { .. } => CatalogError::NotFound(err.to_string()),
            other => CatalogError::Store(other.to_string()),
        }
    }
}

impl From<DataError> for CatalogError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::Store(inner) => inner.into(),
            DataError::Core(inner) => inner.into(),
            DataError::UnknownParameter { .. } => CatalogError::NotFound(err.to_string()),
            DataError::InconsistentShapes { .. }
            | DataError::TypeMismatch { .. }
            | DataError::DuplicateIndex { .. } => {
                CatalogError::InconsistentShapes(err.to_string())
            }
        }
    }
}
