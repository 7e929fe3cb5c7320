//! Row-indexed table view of parameter data.

use std::collections::HashMap;

use mcat_core::Scalar;

use crate::parameter_data::{Column, ParameterData, ParameterTree};
use crate::{DataError, DataResult};

/// Row labels of a [`Table`]: one key per row with one scalar per level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowIndex {
    names: Vec<Option<String>>,
    keys: Vec<Vec<Scalar>>,
}

impl RowIndex {
    /// Unnamed `0..len` index.
    pub fn positional(len: usize) -> Self {
        Self {
            names: vec![None],
            keys: (0..len).map(|i| vec![Scalar::Numeric(i as f64)]).collect(),
        }
    }

    pub fn single(name: impl Into<String>, values: Vec<Scalar>) -> Self {
        Self {
            names: vec![Some(name.into())],
            keys: values.into_iter().map(|v| vec![v]).collect(),
        }
    }

    /// One level per `(name, values)` pair. All levels must have equal length.
    pub fn multi(levels: Vec<(String, Vec<Scalar>)>) -> DataResult<Self> {
        let len = levels.first().map(|(_, v)| v.len()).unwrap_or(0);
        if let Some((name, values)) = levels.iter().find(|(_, v)| v.len() != len) {
            return Err(DataError::InconsistentShapes {
                context: name.clone(),
                detail: format!("index level has {} values, expected {len}", values.len()),
            });
        }
        let mut keys = vec![Vec::with_capacity(levels.len()); len];
        let mut names = Vec::with_capacity(levels.len());
        for (name, values) in levels {
            names.push(Some(name));
            for (key, value) in keys.iter_mut().zip(values) {
                key.push(value);
            }
        }
        Ok(Self { names, keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn nlevels(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[Option<String>] {
        &self.names
    }

    pub fn key(&self, row: usize) -> Option<&[Scalar]> {
        self.keys.get(row).map(Vec::as_slice)
    }

    pub fn keys(&self) -> &[Vec<Scalar>] {
        &self.keys
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub name: String,
    pub values: Vec<Scalar>,
}

/// Columns of scalars sharing one [`RowIndex`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    index: RowIndex,
    columns: Vec<TableColumn>,
}

impl Table {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(index: RowIndex, columns: Vec<TableColumn>) -> DataResult<Self> {
        if let Some(column) = columns.iter().find(|c| c.values.len() != index.len()) {
            return Err(DataError::InconsistentShapes {
                context: column.name.clone(),
                detail: format!(
                    "{} values for an index of length {}",
                    column.values.len(),
                    index.len()
                ),
            });
        }
        Ok(Self { index, columns })
    }

    pub fn index(&self) -> &RowIndex {
        &self.index
    }

    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[Scalar]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Index key and the cells of row `i`, in column order.
    pub fn row(&self, i: usize) -> Option<(&[Scalar], Vec<&Scalar>)> {
        let key = self.index.key(i)?;
        let cells = self.columns.iter().map(|c| &c.values[i]).collect();
        Some((key, cells))
    }

    /// Outer join on the row index.
    ///
    /// Identical indexes are joined side by side. Otherwise the k-th
    /// occurrence of a key in one table lines up with its k-th occurrence in
    /// another; rows come out in first-appearance order and gaps are `Null`.
    pub fn join(tables: Vec<Table>) -> DataResult<Table> {
        let mut tables: Vec<Table> = tables.into_iter().filter(|t| !t.is_empty()).collect();
        if tables.len() <= 1 {
            return Ok(tables.pop().unwrap_or_default());
        }

        let depth = tables[0].index.nlevels();
        if let Some(other) = tables.iter().find(|t| t.index.nlevels() != depth) {
            return Err(DataError::InconsistentShapes {
                context: other.column_names().join(", "),
                detail: format!(
                    "index depth {} does not match depth {depth}",
                    other.index.nlevels()
                ),
            });
        }

        if tables.iter().all(|t| t.index == tables[0].index) {
            let mut tables = tables.into_iter();
            let mut joined = tables.next().unwrap_or_default();
            for table in tables {
                joined.columns.extend(table.columns);
            }
            return Ok(joined);
        }

        let names: Vec<Option<String>> = (0..depth)
            .map(|level| {
                let first = &tables[0].index.names[level];
                tables
                    .iter()
                    .all(|t| &t.index.names[level] == first)
                    .then(|| first.clone())
                    .flatten()
            })
            .collect();

        let mut keys: Vec<Vec<Scalar>> = Vec::new();
        let mut positions: HashMap<(Vec<Scalar>, usize), usize> = HashMap::new();
        let mut placements: Vec<Vec<usize>> = Vec::with_capacity(tables.len());
        for table in &tables {
            let mut seen: HashMap<&[Scalar], usize> = HashMap::new();
            let mut rows = Vec::with_capacity(table.len());
            for key in &table.index.keys {
                let occurrence = seen.entry(key.as_slice()).or_insert(0);
                let slot = *positions
                    .entry((key.clone(), *occurrence))
                    .or_insert_with(|| {
                        keys.push(key.clone());
                        keys.len() - 1
                    });
                *occurrence += 1;
                rows.push(slot);
            }
            placements.push(rows);
        }

        let total = keys.len();
        let mut columns = Vec::new();
        for (table, rows) in tables.into_iter().zip(placements) {
            for column in table.columns {
                let mut values = vec![Scalar::Null; total];
                for (cell, &slot) in column.values.into_iter().zip(&rows) {
                    values[slot] = cell;
                }
                columns.push(TableColumn {
                    name: column.name,
                    values,
                });
            }
        }
        Ok(Table {
            index: RowIndex { names, keys },
            columns,
        })
    }
}

/// Concatenate per-row cells: scalars give one element, arrays all of theirs.
fn flatten(column: &Column) -> Vec<Scalar> {
    let mut out = Vec::with_capacity(column.values.len());
    for cell in &column.values {
        cell.flatten_into(&mut out);
    }
    out
}

fn tree_table(parameter: &str, tree: &ParameterTree) -> DataResult<Table> {
    let Some((primary, deps)) = tree.columns().split_first() else {
        return Ok(Table::empty());
    };
    let values = flatten(primary);
    let index = match deps {
        [] => RowIndex::positional(values.len()),
        [dep] => RowIndex::single(dep.name.clone(), flatten(dep)),
        _ => RowIndex::multi(deps.iter().map(|d| (d.name.clone(), flatten(d))).collect())?,
    };
    if index.len() != values.len() {
        return Err(DataError::InconsistentShapes {
            context: parameter.to_string(),
            detail: format!(
                "{} values for {} index entries",
                values.len(),
                index.len()
            ),
        });
    }
    Table::new(
        index,
        vec![TableColumn {
            name: primary.name.clone(),
            values,
        }],
    )
}

/// Build one indexed table per parameter and outer-join them.
pub fn to_table(data: &ParameterData) -> DataResult<Table> {
    let tables = data
        .iter()
        .map(|(parameter, tree)| tree_table(parameter, tree))
        .collect::<DataResult<Vec<_>>>()?;
    Table::join(tables)
}

/// Render a key for error messages.
pub(crate) fn format_key(key: &[Scalar]) -> String {
    let parts: Vec<String> = key.iter().map(|s| s.to_string()).collect();
    format!("({})", parts.join(", "))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use mcat_core::Value;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn single_dependency_index_keeps_row_order(
            rows in prop::collection::vec((-1e6_f64..1e6, -1e6_f64..1e6), 0..40)
        ) {
            let mut data = ParameterData::new();
            data.insert(
                "y",
                ParameterTree::new(vec![
                    Column { name: "y".into(), values: rows.iter().map(|r| Value::from(r.0)).collect() },
                    Column { name: "x".into(), values: rows.iter().map(|r| Value::from(r.1)).collect() },
                ]),
            );
            let table = to_table(&data).unwrap();
            prop_assert_eq!(table.len(), rows.len());
            for (i, (y, x)) in rows.iter().enumerate() {
                prop_assert_eq!(table.index().key(i), Some(&[Scalar::Numeric(*x)][..]));
                prop_assert_eq!(&table.column("y").unwrap()[i], &Scalar::Numeric(*y));
            }
        }

        #[test]
        fn join_keeps_every_row_of_every_table(
            a in prop::collection::vec(0_u8..5, 1..20),
            b in prop::collection::vec(0_u8..5, 1..20),
        ) {
            let table = |name: &str, keys: &[u8]| {
                Table::new(
                    RowIndex::single("k", keys.iter().map(|k| Scalar::Numeric(f64::from(*k))).collect()),
                    vec![TableColumn {
                        name: name.into(),
                        values: keys.iter().map(|_| Scalar::Numeric(1.0)).collect(),
                    }],
                )
                .unwrap()
            };
            let joined = Table::join(vec![table("a", &a), table("b", &b)]).unwrap();
            let filled = |name: &str| {
                joined.column(name).unwrap().iter().filter(|v| !v.is_null()).count()
            };
            prop_assert_eq!(filled("a"), a.len());
            prop_assert_eq!(filled("b"), b.len());
            prop_assert!(joined.len() >= a.len().max(b.len()));
            prop_assert!(joined.len() <= a.len() + b.len());
        }
    }
}
