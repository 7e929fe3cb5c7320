//! Rebuild per-parameter column data from the stored rows of one run.

use mcat_core::{ParamType, RunDescription, Value};
use mcat_store::MeasurementStore;
use tracing::debug;

use crate::broadcast::reconcile_rows;
use crate::parameter_data::{Column, ParameterData, ParameterTree};
use crate::{DataError, DataResult};

/// Fetch the parameter trees for `requested` (all dependents when empty).
///
/// Each tree holds the parameter column followed by its dependencies, with
/// one cell per stored row where the parameter is not NULL.
pub fn fetch_parameter_data<S: MeasurementStore + ?Sized>(
    store: &S,
    table: &str,
    description: &RunDescription,
    requested: &[String],
) -> DataResult<ParameterData> {
    let names = if requested.is_empty() {
        description.dependent_names()
    } else {
        requested.to_vec()
    };

    let mut data = ParameterData::new();
    for name in names {
        let tree = fetch_tree(store, table, description, &name)?;
        data.insert(name, tree);
    }
    Ok(data)
}

fn fetch_tree<S: MeasurementStore + ?Sized>(
    store: &S,
    table: &str,
    description: &RunDescription,
    parameter: &str,
) -> DataResult<ParameterTree> {
    let specs = description
        .parameter_tree(parameter)
        .ok_or_else(|| DataError::UnknownParameter {
            name: parameter.to_string(),
        })?;
    let columns: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
    let types: Vec<ParamType> = specs.iter().map(|s| s.param_type).collect();

    let mut rows = store.parameter_tree_values(table, &columns)?;
    let broadcast = reconcile_rows(parameter, &columns, &types, &mut rows)?;

    debug!(
        parameter,
        columns = columns.len(),
        rows = rows.len(),
        broadcast,
        "fetched parameter tree"
    );

    if rows.is_empty() {
        return Ok(ParameterTree::default());
    }
    Ok(ParameterTree::new(transpose(&columns, rows)))
}

fn transpose(names: &[&str], rows: Vec<Vec<Value>>) -> Vec<Column> {
    let mut columns: Vec<Column> = names
        .iter()
        .map(|name| Column {
            name: name.to_string(),
            values: Vec::with_capacity(rows.len()),
        })
        .collect();
    for row in rows {
        for (column, cell) in columns.iter_mut().zip(row) {
            column.values.push(cell);
        }
    }
    columns
}
