//! Per-run data source: lazily resolved identity and layout, plus a
//! growing cache of fetched parameter data.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use mcat_core::{Guid, RunDescription, RunId, classify};
use mcat_data::{
    DuplicatePolicy, LabeledArray, ParameterData, Table, fetch_parameter_data, to_labeled_array,
    to_table,
};
use mcat_store::{DatasetInfo, MeasurementStore, RunLayout, SqliteStore};
use serde::Serialize;
use tracing::debug;

use crate::config::ContainerKind;
use crate::entry::EntryMetadata;
use crate::error::{CatalogError, CatalogResult};
use crate::selector::PartitionRef;

/// Opens a store connection on demand.
pub trait Connect {
    type Store: MeasurementStore;

    fn connect(&self) -> CatalogResult<Self::Store>;
}

/// Connector for a database file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabasePath(PathBuf);

impl DatabasePath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Connect for DatabasePath {
    type Store = SqliteStore;

    fn connect(&self) -> CatalogResult<SqliteStore> {
        Ok(SqliteStore::open(&self.0)?)
    }
}

impl<F, S> Connect for F
where
    F: Fn() -> CatalogResult<S>,
    S: MeasurementStore,
{
    type Store = S;

    fn connect(&self) -> CatalogResult<S> {
        self()
    }
}

/// Materialized data of a read.
#[derive(Debug, Clone, PartialEq)]
pub enum Container {
    Table(Table),
    LabeledArray(LabeledArray),
}

impl Container {
    pub fn kind(&self) -> ContainerKind {
        match self {
            Container::Table(_) => ContainerKind::Table,
            Container::LabeledArray(_) => ContainerKind::LabeledArray,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Container::Table(t) => Some(t),
            Container::LabeledArray(_) => None,
        }
    }

    pub fn as_labeled_array(&self) -> Option<&LabeledArray> {
        match self {
            Container::LabeledArray(a) => Some(a),
            Container::Table(_) => None,
        }
    }
}

/// Shape summary of a run, cheap to compute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    /// Rows in the results table.
    pub shape: (u64,),
    /// One partition per dependent parameter.
    pub npartitions: usize,
    pub number_of_records: u64,
    /// Number of independent parameters.
    pub sweep_dimensions: usize,
    pub dataset_metadata: BTreeMap<String, serde_json::Value>,
    pub snapshot: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RunKey {
    Guid(Guid),
    RunId(RunId),
}

/// Lazily initialized handle on one run.
///
/// Every field is resolved on first use and kept for the Source's lifetime.
/// Fetched parameter data is merged into the cache, so a parameter is read
/// from the store at most once.
pub struct Source<C: Connect> {
    connector: C,
    key: RunKey,
    container: ContainerKind,
    duplicate_policy: DuplicatePolicy,
    store: Option<C::Store>,
    guid: Option<Guid>,
    run_id: Option<RunId>,
    layout: Option<RunLayout>,
    dataset: Option<DatasetInfo>,
    dependents: Option<Vec<String>>,
    metadata: Option<EntryMetadata>,
    cache: ParameterData,
}

impl<C: Connect> std::fmt::Debug for Source<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("key", &self.key)
            .field("container", &self.container)
            .field("connected", &self.store.is_some())
            .field("cached", &self.cache.names())
            .finish()
    }
}

impl<C: Connect> Source<C> {
    fn with_key(connector: C, key: RunKey) -> Self {
        Self {
            connector,
            key,
            container: ContainerKind::default(),
            duplicate_policy: DuplicatePolicy::default(),
            store: None,
            guid: None,
            run_id: None,
            layout: None,
            dataset: None,
            dependents: None,
            metadata: None,
            cache: ParameterData::new(),
        }
    }

    pub fn from_guid(connector: C, guid: Guid) -> Self {
        let mut source = Self::with_key(connector, RunKey::Guid(guid.clone()));
        source.guid = Some(guid);
        source
    }

    pub fn from_run_id(connector: C, run_id: RunId) -> Self {
        let mut source = Self::with_key(connector, RunKey::RunId(run_id));
        source.run_id = Some(run_id);
        source
    }

    pub fn with_container(mut self, container: ContainerKind) -> Self {
        self.container = container;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Seed the entry metadata known from a catalog scan.
    pub fn with_metadata(mut self, metadata: EntryMetadata) -> Self {
        self.dependents = Some(metadata.dependent_parameters.clone());
        self.metadata = Some(metadata);
        self
    }

    pub(crate) fn seed_run_id(&mut self, run_id: RunId) {
        self.run_id = Some(run_id);
    }

    pub fn container(&self) -> ContainerKind {
        self.container
    }

    pub fn metadata(&self) -> Option<&EntryMetadata> {
        self.metadata.as_ref()
    }

    /// Parameters already held in memory.
    pub fn cached_parameters(&self) -> Vec<&str> {
        self.cache.names()
    }

    fn store(&mut self) -> CatalogResult<&C::Store> {
        match self.store {
            Some(ref store) => Ok(store),
            None => {
                let store = self.connector.connect()?;
                debug!(key = ?self.key, "opened store connection");
                Ok(self.store.insert(store))
            }
        }
    }

    pub fn run_id(&mut self) -> CatalogResult<RunId> {
        if let Some(run_id) = self.run_id {
            return Ok(run_id);
        }
        let guid = self.guid()?;
        let run_id = self.store()?.run_id_from_guid(&guid)?;
        self.run_id = Some(run_id);
        Ok(run_id)
    }

    pub fn guid(&mut self) -> CatalogResult<Guid> {
        if let Some(guid) = &self.guid {
            return Ok(guid.clone());
        }
        let run_id = match &self.key {
            RunKey::RunId(run_id) => *run_id,
            RunKey::Guid(guid) => return Ok(guid.clone()),
        };
        let guid = self.store()?.guid_from_run_id(run_id)?;
        self.guid = Some(guid.clone());
        Ok(guid)
    }

    fn layout(&mut self) -> CatalogResult<&RunLayout> {
        match self.layout {
            Some(ref layout) => Ok(layout),
            None => {
                let run_id = self.run_id()?;
                let layout = self.store()?.run_layout(run_id)?;
                Ok(self.layout.insert(layout))
            }
        }
    }

    pub fn description(&mut self) -> CatalogResult<&RunDescription> {
        Ok(&self.layout()?.description)
    }

    pub fn table_name(&mut self) -> CatalogResult<&str> {
        Ok(&self.layout()?.table_name)
    }

    /// Dependent parameter names, in stored order.
    pub fn dependent_parameters(&mut self) -> CatalogResult<Vec<String>> {
        if let Some(names) = &self.dependents {
            return Ok(names.clone());
        }
        let names = self.description()?.dependent_names();
        self.dependents = Some(names.clone());
        Ok(names)
    }

    /// Row count, run metadata and snapshot of the underlying dataset.
    pub fn dataset(&mut self) -> CatalogResult<&DatasetInfo> {
        match self.dataset {
            Some(ref info) => Ok(info),
            None => {
                let run_id = self.run_id()?;
                let info = self.store()?.dataset_info(run_id)?;
                Ok(self.dataset.insert(info))
            }
        }
    }

    /// Same as [`Source::dataset`].
    pub fn canonical(&mut self) -> CatalogResult<&DatasetInfo> {
        self.dataset()
    }

    pub fn snapshot(&mut self) -> CatalogResult<Option<&serde_json::Value>> {
        Ok(self.dataset()?.snapshot.as_ref())
    }

    pub fn schema(&mut self) -> CatalogResult<Schema> {
        let npartitions = self.dependent_parameters()?.len();
        let (_, independents) = classify(self.description()?);
        let sweep_dimensions = independents.len();
        let info = self.dataset()?;
        Ok(Schema {
            shape: (info.number_of_results,),
            npartitions,
            number_of_records: info.number_of_results,
            sweep_dimensions,
            dataset_metadata: info.metadata.clone(),
            snapshot: info.snapshot.clone(),
        })
    }

    /// Fetch the parameters in `wanted` that are not cached yet.
    fn fetch_missing(&mut self, wanted: &[String]) -> CatalogResult<()> {
        let missing: Vec<String> = wanted
            .iter()
            .filter(|name| !self.cache.contains(name))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        let layout = self.layout()?.clone();
        let fetched = fetch_parameter_data(
            self.store()?,
            &layout.table_name,
            &layout.description,
            &missing,
        )?;
        debug!(fetched = ?fetched.names(), "merged parameters into source cache");
        self.cache.merge(fetched);
        Ok(())
    }

    fn read_parameters(&mut self, names: &[String]) -> CatalogResult<Container> {
        self.fetch_missing(names)?;
        let data = self.cache.select(names);
        match self.container {
            ContainerKind::Table => Ok(Container::Table(to_table(&data)?)),
            ContainerKind::LabeledArray => {
                let array = to_labeled_array(&data, self.duplicate_policy)?;
                Ok(Container::LabeledArray(array.with_labels(self.description()?)))
            }
        }
    }

    /// All dependent parameters in one container.
    pub fn read(&mut self) -> CatalogResult<Container> {
        let names = self.dependent_parameters()?;
        self.read_parameters(&names)
    }

    /// One dependent parameter, by position or by name.
    pub fn read_partition(&mut self, partition: impl Into<PartitionRef>) -> CatalogResult<Container> {
        let names = self.dependent_parameters()?;
        let name = match partition.into() {
            PartitionRef::Index(i) => {
                let count = names.len();
                names.into_iter().nth(i).ok_or_else(|| {
                    CatalogError::NotFound(format!(
                        "partition {i} is out of range for {count} partitions"
                    ))
                })?
            }
            PartitionRef::Name(name) if names.contains(&name) => name,
            PartitionRef::Name(name) => {
                return Err(CatalogError::NotFound(format!(
                    "{name} is not a dependent parameter of this run"
                )));
            }
        };
        self.read_parameters(std::slice::from_ref(&name))
    }

    /// Iterate partitions in dependent-parameter order.
    pub fn read_chunked(&mut self) -> CatalogResult<Chunks<'_, C>> {
        let names = self.dependent_parameters()?;
        Ok(Chunks {
            source: self,
            names: names.into_iter(),
        })
    }
}

/// Lazy per-partition reads; see [`Source::read_chunked`].
pub struct Chunks<'a, C: Connect> {
    source: &'a mut Source<C>,
    names: std::vec::IntoIter<String>,
}

impl<C: Connect> Iterator for Chunks<'_, C> {
    type Item = CatalogResult<Container>;

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.names.next()?;
        Some(self.source.read_partition(PartitionRef::Name(name)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.names.size_hint()
    }
}
