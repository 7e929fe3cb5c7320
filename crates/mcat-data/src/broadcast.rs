//! Shape reconciliation between array-valued and scalar-valued columns
//! of one parameter tree.

use mcat_core::{NdArray, ParamType, Scalar, Value};

use crate::{DataError, DataResult};

/// True when the tree mixes array columns with scalar columns.
pub fn needs_broadcast(types: &[ParamType]) -> bool {
    types.iter().any(|t| t.is_array()) && types.iter().any(|t| !t.is_array())
}

/// Why a single cell could not be brought to the canonical shape.
#[derive(Debug, Clone, PartialEq)]
pub enum CellError {
    Shape { found: Vec<usize> },
    Kind { expected: &'static str, found: &'static str },
}

/// Expand one scalar cell of a column tagged `tag` to an array of `shape`.
///
/// A cell that already holds an array is kept when its shape matches.
pub fn broadcast_cell(cell: Value, tag: ParamType, shape: &[usize]) -> Result<Value, CellError> {
    let scalar = match cell {
        Value::Array(array) if array.shape() == shape => return Ok(Value::Array(array)),
        Value::Array(array) => {
            return Err(CellError::Shape {
                found: array.shape().to_vec(),
            });
        }
        Value::Scalar(scalar) => scalar,
    };

    let mismatch = |expected: &'static str, found: &Scalar| CellError::Kind {
        expected,
        found: found.kind_name(),
    };

    let array = match tag {
        ParamType::Numeric => {
            let v = scalar.as_f64().ok_or_else(|| mismatch("numeric", &scalar))?;
            NdArray::full_float(shape, v)
        }
        ParamType::Complex => {
            let c = scalar.as_complex().ok_or_else(|| mismatch("complex", &scalar))?;
            NdArray::full_complex(shape, c)
        }
        ParamType::Text => {
            let s = scalar.as_text().ok_or_else(|| mismatch("text", &scalar))?;
            NdArray::full_text(shape, s)
        }
        ParamType::Array => return Err(mismatch("array", &scalar)),
    };
    Ok(Value::Array(array))
}

/// Police array shapes and expand scalar cells in place.
///
/// `names` and `types` describe the columns of each row. Returns whether any
/// broadcasting was applied.
pub fn reconcile_rows(
    parameter: &str,
    names: &[&str],
    types: &[ParamType],
    rows: &mut [Vec<Value>],
) -> DataResult<bool> {
    let array_columns: Vec<usize> = types
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_array())
        .map(|(i, _)| i)
        .collect();
    let Some(&canonical) = array_columns.first() else {
        return Ok(false);
    };
    let expand = needs_broadcast(types);
    if !expand && array_columns.len() == 1 {
        return Ok(false);
    }

    for (row_index, row) in rows.iter_mut().enumerate() {
        let shape = match &row[canonical] {
            Value::Array(array) => array.shape().to_vec(),
            Value::Scalar(scalar) => {
                return Err(DataError::TypeMismatch {
                    parameter: parameter.to_string(),
                    column: names[canonical].to_string(),
                    expected: "array",
                    found: scalar.kind_name(),
                });
            }
        };

        for (column, cell) in row.iter_mut().enumerate() {
            if column == canonical {
                continue;
            }
            let tag = types[column];
            if tag.is_array() {
                match cell {
                    Value::Array(other) if other.shape() == shape.as_slice() => {}
                    Value::Array(other) => {
                        return Err(shape_error(
                            parameter,
                            row_index,
                            names[column],
                            other.shape(),
                            &shape,
                        ));
                    }
                    Value::Scalar(scalar) => {
                        return Err(DataError::TypeMismatch {
                            parameter: parameter.to_string(),
                            column: names[column].to_string(),
                            expected: "array",
                            found: scalar.kind_name(),
                        });
                    }
                }
                continue;
            }

            let taken = std::mem::replace(cell, Value::null());
            *cell = broadcast_cell(taken, tag, &shape).map_err(|e| match e {
                CellError::Shape { found } => {
                    shape_error(parameter, row_index, names[column], &found, &shape)
                }
                CellError::Kind { expected, found } => DataError::TypeMismatch {
                    parameter: parameter.to_string(),
                    column: names[column].to_string(),
                    expected,
                    found,
                },
            })?;
        }
    }
    Ok(expand)
}

fn shape_error(
    parameter: &str,
    row: usize,
    column: &str,
    found: &[usize],
    expected: &[usize],
) -> DataError {
    DataError::InconsistentShapes {
        context: parameter.to_string(),
        detail: format!("row {row}: column `{column}` has shape {found:?}, expected {expected:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcat_core::Complex;

    fn array(values: &[f64]) -> Value {
        Value::Array(NdArray::from_floats(values.to_vec()))
    }

    #[test]
    fn scalar_columns_are_left_alone() {
        let mut rows = vec![vec![Value::from(1.0), Value::from(2.0)]];
        let applied = reconcile_rows(
            "y",
            &["y", "x"],
            &[ParamType::Numeric, ParamType::Numeric],
            &mut rows,
        )
        .unwrap();
        assert!(!applied);
        assert_eq!(rows[0], vec![Value::from(1.0), Value::from(2.0)]);
    }

    #[test]
    fn scalars_fill_the_canonical_shape() {
        let mut rows = vec![vec![array(&[1.0, 2.0, 3.0]), Value::from(5.0), Value::from("a")]];
        let applied = reconcile_rows(
            "trace",
            &["trace", "gate", "tag"],
            &[ParamType::Array, ParamType::Numeric, ParamType::Text],
            &mut rows,
        )
        .unwrap();
        assert!(applied);
        assert_eq!(rows[0][0], array(&[1.0, 2.0, 3.0]));
        assert_eq!(rows[0][1], Value::Array(NdArray::full_float(&[3], 5.0)));
        assert_eq!(rows[0][2], Value::Array(NdArray::full_text(&[3], "a")));
    }

    #[test]
    fn complex_cells_broadcast_to_complex_arrays() {
        let shape = [2, 2];
        let c = Complex::new(1.0, -1.0);
        let out = broadcast_cell(Value::Scalar(Scalar::Complex(c)), ParamType::Complex, &shape)
            .unwrap();
        let Value::Array(a) = out else {
            panic!("expected array");
        };
        assert_eq!(a.shape(), &[2, 2]);
        assert_eq!(a, NdArray::complex(&shape, vec![c; 4]).unwrap());
    }

    #[test]
    fn mismatched_array_shapes_are_rejected() {
        let mut rows = vec![vec![array(&[1.0, 2.0]), array(&[1.0, 2.0, 3.0])]];
        let err = reconcile_rows(
            "a",
            &["a", "b"],
            &[ParamType::Array, ParamType::Array],
            &mut rows,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::InconsistentShapes { .. }));
    }

    #[test]
    fn null_canonical_cell_is_a_type_mismatch() {
        let mut rows = vec![vec![Value::from(1.0), Value::null()]];
        let err = reconcile_rows(
            "y",
            &["y", "trace"],
            &[ParamType::Numeric, ParamType::Array],
            &mut rows,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::TypeMismatch { .. }));
    }

    #[test]
    fn text_in_numeric_column_is_a_type_mismatch() {
        let err = broadcast_cell(Value::from("nope"), ParamType::Numeric, &[2]).unwrap_err();
        assert_eq!(
            err,
            CellError::Kind {
                expected: "numeric",
                found: "text"
            }
        );
    }
}
