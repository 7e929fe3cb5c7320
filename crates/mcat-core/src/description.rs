//! Run description documents and parameter classification.
//!
//! The description is written by the acquisition software and only consumed
//! here. Every supported version carries `interdependencies.paramspecs`;
//! anything newer versions add next to it is ignored.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

pub const LATEST_VERSION: u32 = 3;

/// Storage type tag of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Numeric,
    Text,
    Complex,
    Array,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::Numeric => "numeric",
            ParamType::Text => "text",
            ParamType::Complex => "complex",
            ParamType::Array => "array",
        }
    }

    pub fn is_array(self) -> bool {
        matches!(self, ParamType::Array)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "paramtype", alias = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub inferred_from: Vec<String>,
    pub depends_on: Vec<String>,
}

impl ParamSpec {
    pub fn is_dependent(&self) -> bool {
        !self.depends_on.is_empty()
    }

    /// `label (unit)`, falling back to the name when no label is stored.
    pub fn axis_label(&self) -> String {
        let label = if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        };
        if self.unit.is_empty() {
            label.clone()
        } else {
            format!("{} ({})", label, self.unit)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterDependencies {
    pub paramspecs: Vec<ParamSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDescription {
    pub version: u32,
    pub interdependencies: InterDependencies,
}

impl RunDescription {
    pub fn new(paramspecs: Vec<ParamSpec>) -> Self {
        Self {
            version: 0,
            interdependencies: InterDependencies { paramspecs },
        }
    }

    /// Parse and validate a stored description document.
    pub fn from_json(text: &str) -> CoreResult<Self> {
        let raw: serde_json::Value =
            serde_json::from_str(text).map_err(|e| CoreError::MalformedDescription {
                what: e.to_string(),
            })?;

        let version = raw
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| CoreError::MalformedDescription {
                what: "missing integer `version`".to_string(),
            })?;
        let version = u32::try_from(version)
            .map_err(|_| CoreError::UnsupportedVersion { version: u32::MAX })?;
        if version > LATEST_VERSION {
            return Err(CoreError::UnsupportedVersion { version });
        }

        let description: RunDescription =
            serde_json::from_value(raw).map_err(|e| CoreError::MalformedDescription {
                what: e.to_string(),
            })?;
        description.validate()?;
        Ok(description)
    }

    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn paramspecs(&self) -> &[ParamSpec] {
        &self.interdependencies.paramspecs
    }

    pub fn paramspec(&self, name: &str) -> Option<&ParamSpec> {
        self.paramspecs().iter().find(|p| p.name == name)
    }

    /// The parameter followed by its direct dependencies, in declared order.
    ///
    /// `None` when `name` is not described.
    pub fn parameter_tree(&self, name: &str) -> Option<Vec<&ParamSpec>> {
        let spec = self.paramspec(name)?;
        let mut tree = Vec::with_capacity(1 + spec.depends_on.len());
        tree.push(spec);
        for dep in &spec.depends_on {
            tree.push(self.paramspec(dep)?);
        }
        Some(tree)
    }

    pub fn dependent_names(&self) -> Vec<String> {
        classify(self).0
    }

    pub fn independent_names(&self) -> Vec<String> {
        classify(self).1
    }

    /// Check names are unique, every dependency is described, and no
    /// dependency is itself dependent.
    pub fn validate(&self) -> CoreResult<()> {
        let mut by_name: HashMap<&str, &ParamSpec> = HashMap::new();
        for spec in self.paramspecs() {
            if by_name.insert(spec.name.as_str(), spec).is_some() {
                return Err(CoreError::MalformedDescription {
                    what: format!("duplicate paramspec `{}`", spec.name),
                });
            }
        }

        for spec in self.paramspecs() {
            let mut seen = HashSet::new();
            for dep in &spec.depends_on {
                if !seen.insert(dep.as_str()) {
                    return Err(CoreError::MalformedDescription {
                        what: format!("`{}` lists dependency `{}` twice", spec.name, dep),
                    });
                }
                match by_name.get(dep.as_str()) {
                    None => {
                        return Err(CoreError::MalformedDescription {
                            what: format!("`{}` depends on undescribed `{}`", spec.name, dep),
                        });
                    }
                    Some(dep_spec) if dep_spec.is_dependent() => {
                        return Err(CoreError::MalformedDescription {
                            what: format!(
                                "chained dependency: `{}` depends on dependent `{}`",
                                spec.name, dep
                            ),
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }
}

/// Split paramspecs into `(dependent, independent)` names, preserving stored order.
pub fn classify(description: &RunDescription) -> (Vec<String>, Vec<String>) {
    let mut dependent = Vec::new();
    let mut independent = Vec::new();
    for spec in description.paramspecs() {
        if spec.is_dependent() {
            dependent.push(spec.name.clone());
        } else {
            independent.push(spec.name.clone());
        }
    }
    (dependent, independent)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SWEEP: &str = r#"{
        "version": 0,
        "interdependencies": {
            "paramspecs": [
                {"name": "x", "paramtype": "numeric", "label": "Gate", "unit": "V",
                 "inferred_from": [], "depends_on": []},
                {"name": "y", "paramtype": "numeric", "label": "", "unit": "A",
                 "inferred_from": [], "depends_on": ["x"]},
                {"name": "t", "paramtype": "numeric", "label": "", "unit": "",
                 "inferred_from": [], "depends_on": []},
                {"name": "z", "paramtype": "array", "label": "", "unit": "",
                 "inferred_from": [], "depends_on": ["x", "t"]}
            ]
        }
    }"#;

    #[test]
    fn classify_preserves_order() {
        let desc = RunDescription::from_json(SWEEP).unwrap();
        let (dep, indep) = classify(&desc);
        assert_eq!(dep, vec!["y", "z"]);
        assert_eq!(indep, vec!["x", "t"]);
    }

    #[test]
    fn parameter_tree_lists_parameter_then_dependencies() {
        let desc = RunDescription::from_json(SWEEP).unwrap();
        let names: Vec<&str> = desc
            .parameter_tree("z")
            .unwrap()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["z", "x", "t"]);
        assert!(desc.parameter_tree("nope").is_none());
    }

    #[test]
    fn type_key_is_accepted_as_alias() {
        let text = r#"{"version": 1, "interdependencies": {"paramspecs": [
            {"name": "x", "type": "text", "depends_on": []}
        ]}}"#;
        let desc = RunDescription::from_json(text).unwrap();
        assert_eq!(desc.paramspecs()[0].param_type, ParamType::Text);
    }

    #[test]
    fn missing_depends_on_is_malformed() {
        let text = r#"{"version": 0, "interdependencies": {"paramspecs": [
            {"name": "x", "paramtype": "numeric"}
        ]}}"#;
        let err = RunDescription::from_json(text).unwrap_err();
        assert!(matches!(err, CoreError::MalformedDescription { .. }));
        assert!(err.to_string().contains("depends_on"));
    }

    #[test]
    fn newer_version_is_rejected() {
        let text = r#"{"version": 9, "interdependencies": {"paramspecs": []}}"#;
        let err = RunDescription::from_json(text).unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedVersion { version: 9 }));
    }

    #[test]
    fn chained_dependency_is_rejected() {
        let text = r#"{"version": 0, "interdependencies": {"paramspecs": [
            {"name": "x", "paramtype": "numeric", "depends_on": []},
            {"name": "y", "paramtype": "numeric", "depends_on": ["x"]},
            {"name": "z", "paramtype": "numeric", "depends_on": ["y"]}
        ]}}"#;
        let err = RunDescription::from_json(text).unwrap_err();
        assert!(err.to_string().contains("chained"));
    }

    #[test]
    fn undescribed_dependency_is_rejected() {
        let text = r#"{"version": 0, "interdependencies": {"paramspecs": [
            {"name": "y", "paramtype": "numeric", "depends_on": ["x"]}
        ]}}"#;
        assert!(RunDescription::from_json(text).is_err());
    }

    #[test]
    fn axis_label_falls_back_to_name() {
        let desc = RunDescription::from_json(SWEEP).unwrap();
        assert_eq!(desc.paramspec("x").unwrap().axis_label(), "Gate (V)");
        assert_eq!(desc.paramspec("y").unwrap().axis_label(), "y (A)");
        assert_eq!(desc.paramspec("t").unwrap().axis_label(), "t");
    }

    #[test]
    fn later_version_extras_are_ignored() {
        let text = r#"{"version": 3,
            "interdependencies": {"paramspecs": [
                {"name": "x", "paramtype": "numeric", "depends_on": []}
            ]},
            "interdependencies_": {"parameters": {}, "dependencies": {}},
            "shapes": null}"#;
        let desc = RunDescription::from_json(text).unwrap();
        assert_eq!(desc.independent_names(), vec!["x"]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn classify_partitions_every_paramspec(flags in prop::collection::vec(any::<bool>(), 0..12)) {
            // index 0 is always independent so dependents have something to point at
            let specs: Vec<ParamSpec> = flags
                .iter()
                .enumerate()
                .map(|(i, &dependent)| ParamSpec {
                    name: format!("p{i}"),
                    param_type: ParamType::Numeric,
                    label: String::new(),
                    unit: String::new(),
                    inferred_from: Vec::new(),
                    depends_on: if dependent && i > 0 { vec!["p0".to_string()] } else { Vec::new() },
                })
                .collect();
            let desc = RunDescription::new(specs.clone());
            let (dep, indep) = classify(&desc);

            prop_assert_eq!(dep.len() + indep.len(), specs.len());
            let expected_dep: Vec<String> = specs.iter().filter(|s| s.is_dependent()).map(|s| s.name.clone()).collect();
            let expected_indep: Vec<String> = specs.iter().filter(|s| !s.is_dependent()).map(|s| s.name.clone()).collect();
            prop_assert_eq!(dep, expected_dep);
            prop_assert_eq!(indep, expected_indep);
        }
    }
}
