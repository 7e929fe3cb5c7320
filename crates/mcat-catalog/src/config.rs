//! Catalog configuration, loadable from YAML.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use mcat_data::DuplicatePolicy;
use serde::Deserialize;

use crate::error::{CatalogError, CatalogResult};

/// Container a Source materializes its data into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContainerKind {
    #[default]
    Table,
    LabeledArray,
}

impl ContainerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContainerKind::Table => "table",
            ContainerKind::LabeledArray => "labeled_array",
        }
    }
}

impl FromStr for ContainerKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "table" | "dataframe" => Ok(ContainerKind::Table),
            "labeled_array" | "xarray" => Ok(ContainerKind::LabeledArray),
            other => Err(CatalogError::Configuration(format!(
                "unknown container `{other}`, expected `table` or `labeled_array`"
            ))),
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    pub path: PathBuf,
    pub container: ContainerKind,
    pub duplicate_policy: DuplicatePolicy,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    path: PathBuf,
    #[serde(default)]
    container: Option<String>,
    #[serde(default)]
    duplicate_policy: DuplicatePolicy,
}

impl CatalogConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            container: ContainerKind::default(),
            duplicate_policy: DuplicatePolicy::default(),
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

    pub fn from_yaml_str(content: &str) -> CatalogResult<Self> {
        let raw: RawConfig = serde_yaml::from_str(content)?;
        let container = match raw.container {
            Some(name) => name.parse()?,
            None => ContainerKind::default(),
        };
        Ok(Self {
            path: raw.path,
            container,
            duplicate_policy: raw.duplicate_policy,
        })
    }

    /// Load a config from a YAML file. A relative `path` is resolved against
    /// the directory holding the file.
    pub fn load_yaml(path: &Path) -> CatalogResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config = Self::from_yaml_str(&content)?;
        if config.path.is_relative() {
            if let Some(dir) = path.parent() {
                config.path = dir.join(&config.path);
            }
        }
        Ok(config)
    }
}
