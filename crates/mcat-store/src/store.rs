//! Row-store interface consumed by the reconstructor and the catalog.

use std::collections::HashMap;

use mcat_core::{Guid, RunId, Value};

use crate::StoreResult;
use crate::types::{DatasetInfo, ExperimentInfo, RunLayout, RunRecord};

/// Read-only access to a measurement database.
///
/// Every call is a blocking read. Implementations own their connection and
/// release it when dropped.
pub trait MeasurementStore {
    /// Full scan of the run table, in run-id order.
    fn runs(&self) -> StoreResult<Vec<RunRecord>>;

    fn run(&self, run_id: RunId) -> StoreResult<RunRecord>;

    /// `exp_id -> (experiment name, sample name)`.
    fn experiments(&self) -> StoreResult<HashMap<i64, ExperimentInfo>>;

    fn run_id_from_guid(&self, guid: &Guid) -> StoreResult<RunId>;

    fn guid_from_run_id(&self, run_id: RunId) -> StoreResult<Guid>;

    /// Parsed description and results-table name of one run.
    fn run_layout(&self, run_id: RunId) -> StoreResult<RunLayout>;

    /// Rows of `columns` from `table` where the first column is not NULL.
    /// Each row is aligned to `columns`.
    fn parameter_tree_values(&self, table: &str, columns: &[&str]) -> StoreResult<Vec<Vec<Value>>>;

    fn dataset_info(&self, run_id: RunId) -> StoreResult<DatasetInfo>;
}

impl<S: MeasurementStore + ?Sized> MeasurementStore for &S {
    fn runs(&self) -> StoreResult<Vec<RunRecord>> {
        (**self).runs()
    }

    fn run(&self, run_id: RunId) -> StoreResult<RunRecord> {
        (**self).run(run_id)
    }

    fn experiments(&self) -> StoreResult<HashMap<i64, ExperimentInfo>> {
        (**self).experiments()
    }

    fn run_id_from_guid(&self, guid: &Guid) -> StoreResult<RunId> {
        (**self).run_id_from_guid(guid)
    }

    fn guid_from_run_id(&self, run_id: RunId) -> StoreResult<Guid> {
        (**self).guid_from_run_id(run_id)
    }

    fn run_layout(&self, run_id: RunId) -> StoreResult<RunLayout> {
        (**self).run_layout(run_id)
    }

    fn parameter_tree_values(&self, table: &str, columns: &[&str]) -> StoreResult<Vec<Vec<Value>>> {
        (**self).parameter_tree_values(table, columns)
    }

    fn dataset_info(&self, run_id: RunId) -> StoreResult<DatasetInfo> {
        (**self).dataset_info(run_id)
    }
}
