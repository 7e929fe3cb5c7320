//! Catalog of the runs in one measurement database.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use mcat_core::{Guid, RunId};
use mcat_data::DuplicatePolicy;
use mcat_store::MeasurementStore;
use tracing::{debug, info};

use crate::config::{CatalogConfig, ContainerKind};
use crate::entry::{CatalogEntry, EntryMetadata};
use crate::error::{CatalogError, CatalogResult};
use crate::search::SearchQuery;
use crate::selector::RunSelector;
use crate::source::{Connect, DatabasePath, Source};

#[derive(Debug, Default)]
struct LoadedRuns {
    entries: Vec<CatalogEntry>,
    by_guid: HashMap<Guid, usize>,
    guid_by_run_id: HashMap<RunId, Guid>,
    run_id_by_guid: HashMap<Guid, RunId>,
}

#[derive(Debug)]
enum CatalogState {
    Unloaded,
    Loaded(LoadedRuns),
}

/// Entries for every run of one database, built by a single scan.
#[derive(Debug)]
pub struct Catalog<C: Connect + Clone = DatabasePath> {
    connector: C,
    location: PathBuf,
    container: ContainerKind,
    duplicate_policy: DuplicatePolicy,
    state: CatalogState,
}

impl Catalog<DatabasePath> {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::with_connector(DatabasePath::new(path.clone()), path)
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::open(config.path.clone())
            .with_container(config.container)
            .with_duplicate_policy(config.duplicate_policy)
    }
}

impl<C: Connect + Clone> Catalog<C> {
    /// Catalog over any connector; `location` is only used in entry descriptions.
    pub fn with_connector(connector: C, location: impl Into<PathBuf>) -> Self {
        Self {
            connector,
            location: location.into(),
            container: ContainerKind::default(),
            duplicate_policy: DuplicatePolicy::default(),
            state: CatalogState::Unloaded,
        }
    }

    pub fn with_container(mut self, container: ContainerKind) -> Self {
        self.container = container;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, CatalogState::Loaded(_))
    }

    /// Scan the run table and rebuild every entry.
    pub fn load(&mut self) -> CatalogResult<()> {
        let store = self.connector.connect()?;
        let experiments = store.experiments()?;
        let records = store.runs()?;

        let mut loaded = LoadedRuns::default();
        for record in &records {
            let experiment = experiments.get(&record.exp_id).ok_or_else(|| {
                CatalogError::NotFound(format!(
                    "experiment {} of run {}",
                    record.exp_id, record.run_id
                ))
            })?;
            let metadata = EntryMetadata::from_run(record, experiment)?;
            let entry = CatalogEntry::new(
                record.guid.clone(),
                record.run_id,
                &self.location,
                metadata,
            );
            debug!(run_id = %record.run_id, guid = %record.guid, "catalog entry");

            loaded.by_guid.insert(record.guid.clone(), loaded.entries.len());
            loaded
                .guid_by_run_id
                .insert(record.run_id, record.guid.clone());
            loaded
                .run_id_by_guid
                .insert(record.guid.clone(), record.run_id);
            loaded.entries.push(entry);
        }

        info!(
            path = %self.location.display(),
            runs = loaded.entries.len(),
            "catalog loaded"
        );
        self.state = CatalogState::Loaded(loaded);
        Ok(())
    }

    fn not_found(&self, what: String) -> CatalogError {
        CatalogError::NotFound(format!("{what} in {}", self.location.display()))
    }

    fn loaded(&self, operation: &'static str) -> CatalogResult<&LoadedRuns> {
        match &self.state {
            CatalogState::Loaded(runs) => Ok(runs),
            CatalogState::Unloaded => Err(CatalogError::NotInitialized { operation }),
        }
    }

    pub fn entries(&self) -> CatalogResult<&[CatalogEntry]> {
        Ok(&self.loaded("entries")?.entries)
    }

    pub fn len(&self) -> CatalogResult<usize> {
        Ok(self.loaded("len")?.entries.len())
    }

    pub fn is_empty(&self) -> CatalogResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Distinct experiment names, sorted.
    pub fn experiments(&self) -> CatalogResult<Vec<String>> {
        let runs = self.loaded("experiments")?;
        let names: BTreeSet<&str> = runs
            .entries
            .iter()
            .map(|e| e.metadata.experiment_name.as_str())
            .collect();
        Ok(names.into_iter().map(str::to_string).collect())
    }

    /// Distinct sample names, sorted.
    pub fn samples(&self) -> CatalogResult<Vec<String>> {
        let runs = self.loaded("samples")?;
        let names: BTreeSet<&str> = runs
            .entries
            .iter()
            .map(|e| e.metadata.sample_name.as_str())
            .collect();
        Ok(names.into_iter().map(str::to_string).collect())
    }

    pub fn guids(&self) -> CatalogResult<Vec<Guid>> {
        let runs = self.loaded("guids")?;
        Ok(runs.entries.iter().map(|e| e.guid.clone()).collect())
    }

    pub fn run_ids(&self) -> CatalogResult<Vec<RunId>> {
        let runs = self.loaded("run_ids")?;
        Ok(runs.entries.iter().map(|e| e.run_id).collect())
    }

    pub fn guid_for_run_id(&self, run_id: RunId) -> CatalogResult<Guid> {
        self.loaded("guid_for_run_id")?
            .guid_by_run_id
            .get(&run_id)
            .cloned()
            .ok_or_else(|| self.not_found(format!("run_id {run_id}")))
    }

    pub fn run_id_for_guid(&self, guid: &Guid) -> CatalogResult<RunId> {
        self.loaded("run_id_for_guid")?
            .run_id_by_guid
            .get(guid)
            .copied()
            .ok_or_else(|| self.not_found(format!("guid {guid}")))
    }

    pub fn lookup_by_guid(&self, guid: &str) -> CatalogResult<&CatalogEntry> {
        let runs = self.loaded("lookup_by_guid")?;
        let guid = Guid::parse(guid)?;
        runs.by_guid
            .get(&guid)
            .map(|&i| &runs.entries[i])
            .ok_or_else(|| self.not_found(format!("guid {guid}")))
    }

    pub fn lookup_by_run_id(&self, run_id: RunId) -> CatalogResult<&CatalogEntry> {
        let guid = self.guid_for_run_id(run_id)?;
        self.lookup_by_guid(guid.as_str())
    }

    /// Resolve a selector to entries, in catalog order.
    pub fn select(&self, selector: &RunSelector) -> CatalogResult<Vec<&CatalogEntry>> {
        match selector {
            RunSelector::RunId(run_id) => Ok(vec![self.lookup_by_run_id(*run_id)?]),
            RunSelector::Guid(guid) => Ok(vec![self.lookup_by_guid(guid)?]),
            RunSelector::RunIdRange(range) => {
                let runs = self.loaded("select")?;
                Ok(runs
                    .entries
                    .iter()
                    .filter(|e| range.contains(&e.run_id.get()))
                    .collect())
            }
        }
    }

    pub fn search(&self, query: &SearchQuery) -> CatalogResult<Vec<&CatalogEntry>> {
        let runs = self.loaded("search")?;
        Ok(runs.entries.iter().filter(|e| query.matches(e)).collect())
    }

    /// Data source for a single run.
    pub fn source(&self, selector: impl Into<RunSelector>) -> CatalogResult<Source<C>> {
        let selector = selector.into();
        let entry = match selector {
            RunSelector::RunId(run_id) => self.lookup_by_run_id(run_id)?,
            RunSelector::Guid(ref guid) => self.lookup_by_guid(guid)?,
            RunSelector::RunIdRange(range) => {
                return Err(CatalogError::Configuration(format!(
                    "a source needs a single run, got run_id range {}..{}",
                    range.start, range.end
                )));
            }
        };
        let mut source = Source::from_guid(self.connector.clone(), entry.guid.clone())
            .with_container(self.container)
            .with_duplicate_policy(self.duplicate_policy)
            .with_metadata(entry.metadata.clone());
        source.seed_run_id(entry.run_id);
        Ok(source)
    }
}
