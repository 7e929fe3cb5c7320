//! mcat-data: reconstruct per-parameter arrays from stored rows and
//! materialize them as tables or labeled arrays.

pub mod broadcast;
pub mod labeled;
pub mod parameter_data;
pub mod reconstruct;
pub mod table;

pub use labeled::{DataVariable, Dimension, DuplicatePolicy, LabeledArray, to_labeled_array};
pub use parameter_data::{Column, ParameterData, ParameterTree};
pub use reconstruct::fetch_parameter_data;
pub use table::{RowIndex, Table, TableColumn, to_table};

pub type DataResult<T> = Result<T, DataError>;

#[derive(thiserror::Error, Debug)]
pub enum DataError {
    #[error("Unknown parameter: {name}")]
    UnknownParameter { name: String },

    #[error("Inconsistent parameter shapes for {context}: {detail}")]
    InconsistentShapes { context: String, detail: String },

    #[error("Type mismatch in {parameter}.{column}: expected {expected}, found {found}")]
    TypeMismatch {
        parameter: String,
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Duplicate index entry {key}")]
    DuplicateIndex { key: String },

    #[error(transparent)]
    Store(#[from] mcat_store::StoreError),

    #[error(transparent)]
    Core(#[from] mcat_core::CoreError),
}
