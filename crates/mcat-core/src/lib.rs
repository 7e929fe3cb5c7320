//! mcat-core: stable foundation for the measurement catalog.
//!
//! Contains:
//! - value (scalars, n-d arrays and fetched cells)
//! - numeric (float canonicalization used by labels)
//! - ids (run identifiers: integer run-id and GUID)
//! - description (run description document + parameter classification)
//! - error (shared error types)

pub mod description;
pub mod error;
pub mod ids;
pub mod numeric;
pub mod value;

// Re-exports: nice ergonomics for downstream crates
pub use description::{LATEST_VERSION, ParamSpec, ParamType, RunDescription, classify};
pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use value::*;

pub use ndarray;
