//! Catalog facade over a measurement database.
//!
//! A [`Catalog`] scans the run table once and lists every run as an entry
//! with its experiment, sample and parameter names. A [`Source`] is a lazy
//! handle on one run that reads its parameter data into a table or a
//! labeled array on demand.

pub mod catalog;
pub mod config;
pub mod entry;
pub mod error;
pub mod search;
pub mod selector;
pub mod source;

pub use catalog::Catalog;
pub use config::{CatalogConfig, ContainerKind};
pub use entry::{CatalogEntry, EntryMetadata};
pub use error::{CatalogError, CatalogResult};
pub use search::SearchQuery;
pub use selector::{PartitionRef, RunSelector};
pub use source::{Chunks, Connect, Container, DatabasePath, Schema, Source};

pub use mcat_data::DuplicatePolicy;
