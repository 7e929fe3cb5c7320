//! Ways of naming a run and a partition.

use std::ops::Range;

use mcat_core::RunId;

/// Identifies one or more runs of a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSelector {
    RunId(RunId),
    /// Must be a well-formed GUID; checked when resolved.
    Guid(String),
    /// Every run whose id falls in the half-open range.
    RunIdRange(Range<i64>),
}

impl From<RunId> for RunSelector {
    fn from(id: RunId) -> Self {
        RunSelector::RunId(id)
    }
}

impl From<i64> for RunSelector {
    fn from(id: i64) -> Self {
        RunSelector::RunId(RunId::new(id))
    }
}

impl From<&str> for RunSelector {
    fn from(guid: &str) -> Self {
        RunSelector::Guid(guid.to_string())
    }
}

impl From<String> for RunSelector {
    fn from(guid: String) -> Self {
        RunSelector::Guid(guid)
    }
}

impl From<Range<i64>> for RunSelector {
    fn from(range: Range<i64>) -> Self {
        RunSelector::RunIdRange(range)
    }
}

/// One partition of a Source: a position in its dependent-parameter list
/// or a parameter name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionRef {
    Index(usize),
    Name(String),
}

impl From<usize> for PartitionRef {
    fn from(i: usize) -> Self {
        PartitionRef::Index(i)
    }
}

impl From<&str> for PartitionRef {
    fn from(name: &str) -> Self {
        PartitionRef::Name(name.to_string())
    }
}

impl From<String> for PartitionRef {
    fn from(name: String) -> Self {
        PartitionRef::Name(name)
    }
}
