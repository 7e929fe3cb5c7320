//! Labeled n-d array view: one dimension per index level, coordinates
//! taken from the index values.

use std::collections::{HashMap, HashSet};

use mcat_core::{RunDescription, Scalar};
use serde::Deserialize;

use crate::parameter_data::ParameterData;
use crate::table::{Table, format_key, to_table};
use crate::{DataError, DataResult};

/// What to do with rows whose index key repeats an earlier row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    KeepFirst,
    KeepLast,
    Reject,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub name: String,
    pub coords: Vec<Scalar>,
    pub label: Option<String>,
}

/// Values laid out row-major over the array's dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct DataVariable {
    pub name: String,
    pub values: Vec<Scalar>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledArray {
    dims: Vec<Dimension>,
    variables: Vec<DataVariable>,
}

impl LabeledArray {
    pub fn from_table(table: &Table, policy: DuplicatePolicy) -> DataResult<Self> {
        if table.is_empty() {
            return Ok(Self::default());
        }
        let rows = unique_rows(table, policy)?;
        let index = table.index();

        if index.nlevels() == 1 {
            let name = index.names()[0].clone().unwrap_or_else(|| "index".to_string());
            let coords = rows.iter().map(|&r| index.keys()[r][0].clone()).collect();
            let variables = table
                .columns()
                .iter()
                .map(|c| DataVariable {
                    name: c.name.clone(),
                    values: rows.iter().map(|&r| c.values[r].clone()).collect(),
                    label: None,
                })
                .collect();
            return Ok(Self {
                dims: vec![Dimension {
                    name,
                    coords,
                    label: None,
                }],
                variables,
            });
        }

        let mut dims = Vec::with_capacity(index.nlevels());
        let mut lookups: Vec<HashMap<&Scalar, usize>> = Vec::with_capacity(index.nlevels());
        for (level, name) in index.names().iter().enumerate() {
            let mut coords: Vec<Scalar> = rows
                .iter()
                .map(|&r| index.keys()[r][level].clone())
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            coords.sort();
            dims.push(Dimension {
                name: name.clone().unwrap_or_else(|| format!("level_{level}")),
                coords,
                label: None,
            });
        }
        for dim in &dims {
            lookups.push(dim.coords.iter().enumerate().map(|(i, c)| (c, i)).collect());
        }

        let shape: Vec<usize> = dims.iter().map(|d| d.coords.len()).collect();
        let size: usize = shape.iter().product();
        let offsets: Vec<usize> = rows
            .iter()
            .map(|&r| {
                index.keys()[r]
                    .iter()
                    .zip(&lookups)
                    .zip(&shape)
                    .fold(0, |offset, ((coord, lookup), &extent)| {
                        offset * extent + lookup.get(coord).copied().unwrap_or(0)
                    })
            })
            .collect();

        let variables = table
            .columns()
            .iter()
            .map(|c| {
                let mut values = vec![Scalar::Null; size];
                for (&r, &offset) in rows.iter().zip(&offsets) {
                    values[offset] = c.values[r].clone();
                }
                DataVariable {
                    name: c.name.clone(),
                    values,
                    label: None,
                }
            })
            .collect();

        Ok(Self { dims, variables })
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    pub fn dim(&self, name: &str) -> Option<&Dimension> {
        self.dims.iter().find(|d| d.name == name)
    }

    pub fn shape(&self) -> Vec<usize> {
        self.dims.iter().map(|d| d.coords.len()).collect()
    }

    pub fn variables(&self) -> &[DataVariable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&DataVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Point lookup by one coordinate label per dimension.
    pub fn get(&self, variable: &str, labels: &[Scalar]) -> Option<&Scalar> {
        if labels.len() != self.dims.len() {
            return None;
        }
        let mut offset = 0;
        for (dim, label) in self.dims.iter().zip(labels) {
            let position = dim.coords.iter().position(|c| c == label)?;
            offset = offset * dim.coords.len() + position;
        }
        self.variable(variable)?.values.get(offset)
    }

    /// Attach `label (unit)` strings from the run description to matching
    /// dimensions and variables.
    pub fn with_labels(mut self, description: &RunDescription) -> Self {
        for dim in &mut self.dims {
            dim.label = description.paramspec(&dim.name).map(|s| s.axis_label());
        }
        for var in &mut self.variables {
            var.label = description.paramspec(&var.name).map(|s| s.axis_label());
        }
        self
    }
}

/// Row positions that survive the duplicate policy, in table order.
fn unique_rows(table: &Table, policy: DuplicatePolicy) -> DataResult<Vec<usize>> {
    let keys = table.index().keys();
    let mut seen: HashSet<&[Scalar]> = HashSet::with_capacity(keys.len());
    match policy {
        DuplicatePolicy::KeepFirst => Ok((0..keys.len())
            .filter(|&r| seen.insert(keys[r].as_slice()))
            .collect()),
        DuplicatePolicy::KeepLast => {
            let mut rows: Vec<usize> = (0..keys.len())
                .rev()
                .filter(|&r| seen.insert(keys[r].as_slice()))
                .collect();
            rows.reverse();
            Ok(rows)
        }
        DuplicatePolicy::Reject => {
            for key in keys {
                if !seen.insert(key.as_slice()) {
                    return Err(DataError::DuplicateIndex {
                        key: format_key(key),
                    });
                }
            }
            Ok((0..keys.len()).collect())
        }
    }
}

/// Join the parameter data into a table and project it onto a labeled array.
pub fn to_labeled_array(data: &ParameterData, policy: DuplicatePolicy) -> DataResult<LabeledArray> {
    let table = to_table(data)?;
    LabeledArray::from_table(&table, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter_data::{Column, ParameterTree};
    use crate::table::{RowIndex, TableColumn};
    use mcat_core::{ParamSpec, ParamType, Value};

    fn num(v: f64) -> Scalar {
        Scalar::Numeric(v)
    }

    fn grid_table(xs: &[f64], ys: &[f64], zs: &[f64]) -> Table {
        Table::new(
            RowIndex::multi(vec![
                ("x".into(), xs.iter().copied().map(num).collect()),
                ("y".into(), ys.iter().copied().map(num).collect()),
            ])
            .unwrap(),
            vec![TableColumn {
                name: "z".into(),
                values: zs.iter().copied().map(num).collect(),
            }],
        )
        .unwrap()
    }

    #[test]
    fn duplicate_keys_keep_the_first_row_by_default() {
        let table = grid_table(&[1.0, 1.0], &[2.0, 2.0], &[10.0, 20.0]);
        let array = LabeledArray::from_table(&table, DuplicatePolicy::default()).unwrap();
        assert_eq!(array.shape(), vec![1, 1]);
        assert_eq!(array.get("z", &[num(1.0), num(2.0)]), Some(&num(10.0)));
    }

    #[test]
    fn keep_last_and_reject_policies() {
        let table = grid_table(&[1.0, 1.0], &[2.0, 2.0], &[10.0, 20.0]);
        let last = LabeledArray::from_table(&table, DuplicatePolicy::KeepLast).unwrap();
        assert_eq!(last.get("z", &[num(1.0), num(2.0)]), Some(&num(20.0)));

        let err = LabeledArray::from_table(&table, DuplicatePolicy::Reject).unwrap_err();
        assert!(matches!(err, DataError::DuplicateIndex { .. }));
    }

    #[test]
    fn sparse_grids_are_filled_with_null() {
        let table = grid_table(&[0.0, 1.0, 0.0], &[5.0, 6.0, 6.0], &[1.0, 2.0, 3.0]);
        let array = LabeledArray::from_table(&table, DuplicatePolicy::KeepFirst).unwrap();
        assert_eq!(array.shape(), vec![2, 2]);
        assert_eq!(array.dim("x").unwrap().coords, vec![num(0.0), num(1.0)]);
        assert_eq!(
            array.variable("z").unwrap().values,
            vec![num(1.0), num(3.0), Scalar::Null, num(2.0)]
        );
    }

    #[test]
    fn unnamed_levels_get_default_names() {
        let table = Table::new(
            RowIndex::positional(2),
            vec![TableColumn {
                name: "y".into(),
                values: vec![num(3.0), num(4.0)],
            }],
        )
        .unwrap();
        let array = LabeledArray::from_table(&table, DuplicatePolicy::KeepFirst).unwrap();
        assert_eq!(array.dims()[0].name, "index");
        assert_eq!(array.dims()[0].coords, vec![num(0.0), num(1.0)]);
    }

    #[test]
    fn labels_come_from_the_description() {
        let mut data = ParameterData::new();
        data.insert(
            "y",
            ParameterTree::new(vec![
                Column {
                    name: "y".into(),
                    values: vec![Value::from(1.0)],
                },
                Column {
                    name: "x".into(),
                    values: vec![Value::from(0.0)],
                },
            ]),
        );
        let description = RunDescription::new(vec![
            ParamSpec {
                name: "x".into(),
                param_type: ParamType::Numeric,
                label: "Gate".into(),
                unit: "V".into(),
                inferred_from: Vec::new(),
                depends_on: Vec::new(),
            },
            ParamSpec {
                name: "y".into(),
                param_type: ParamType::Numeric,
                label: String::new(),
                unit: String::new(),
                inferred_from: Vec::new(),
                depends_on: vec!["x".into()],
            },
        ]);
        let array = to_labeled_array(&data, DuplicatePolicy::KeepFirst)
            .unwrap()
            .with_labels(&description);
        assert_eq!(array.dims()[0].label.as_deref(), Some("Gate (V)"));
        assert_eq!(array.variable("y").unwrap().label.as_deref(), Some("y"));
    }
}
