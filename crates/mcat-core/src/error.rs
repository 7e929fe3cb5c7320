use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Malformed run description: {what}")]
    MalformedDescription { what: String },

    #[error("Run description serialization error: {0}")]
    DescriptionJson(#[from] serde_json::Error),

    #[error("Unsupported run description version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error("Array shape {shape:?} does not hold {len} elements")]
    ArrayShape { shape: Vec<usize>, len: usize },

    #[error("Invalid GUID format: {value}")]
    InvalidGuid { value: String },
}
