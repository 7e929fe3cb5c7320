//! Metadata filters over loaded entries.

use crate::entry::CatalogEntry;
use crate::error::{CatalogError, CatalogResult};

/// Exact-match filters; every filter that is set must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub experiment_name: Option<String>,
    pub sample_name: Option<String>,
    pub dependent_parameter: Option<String>,
    pub independent_parameter: Option<String>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a query from `key = value` pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> CatalogResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key {
                "experiment_name" => &mut query.experiment_name,
                "sample_name" => &mut query.sample_name,
                "dependent_parameter" => &mut query.dependent_parameter,
                "independent_parameter" => &mut query.independent_parameter,
                other => {
                    return Err(CatalogError::Configuration(format!(
                        "unknown search key `{other}`"
                    )));
                }
            };
            *slot = Some(value.to_string());
        }
        Ok(query)
    }

    pub fn experiment(mut self, name: impl Into<String>) -> Self {
        self.experiment_name = Some(name.into());
        self
    }

    pub fn sample(mut self, name: impl Into<String>) -> Self {
        self.sample_name = Some(name.into());
        self
    }

    pub fn dependent(mut self, name: impl Into<String>) -> Self {
        self.dependent_parameter = Some(name.into());
        self
    }

    pub fn independent(mut self, name: impl Into<String>) -> Self {
        self.independent_parameter = Some(name.into());
        self
    }

    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        let meta = &entry.metadata;
        let same = |filter: &Option<String>, value: &str| filter.as_deref().is_none_or(|f| f == value);
        let listed =
            |filter: &Option<String>, names: &[String]| filter.as_ref().is_none_or(|f| names.contains(f));

        same(&self.experiment_name, &meta.experiment_name)
            && same(&self.sample_name, &meta.sample_name)
            && listed(&self.dependent_parameter, &meta.dependent_parameters)
            && listed(&self.independent_parameter, &meta.independent_parameters)
    }
}
