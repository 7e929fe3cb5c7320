//! Cell values as fetched from a results table.
//!
//! A results-table cell is either a scalar (`numeric`, `text`, `complex` or
//! SQL `NULL`) or an n-dimensional array decoded from a blob. Scalars double as
//! index labels, so [`Scalar`] carries total equality, hashing and ordering.

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};

use ndarray::{Array1, ArrayD, IxDyn};

use crate::numeric::{Complex, Real, canonical_bits, canonical_cmp};
use crate::{CoreError, CoreResult};

/// One scalar cell.
#[derive(Debug, Clone)]
pub enum Scalar {
    Null,
    Numeric(Real),
    Complex(Complex),
    Text(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Real value of a numeric cell. `Null` reads as NaN.
    pub fn as_f64(&self) -> Option<Real> {
        match self {
            Scalar::Numeric(v) => Some(*v),
            Scalar::Null => Some(Real::NAN),
            _ => None,
        }
    }

    pub fn as_complex(&self) -> Option<Complex> {
        match self {
            Scalar::Complex(c) => Some(*c),
            Scalar::Numeric(v) => Some(Complex::new(*v, 0.0)),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Numeric(_) => "numeric",
            Scalar::Complex(_) => "complex",
            Scalar::Text(_) => "text",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Scalar::Null => 0,
            Scalar::Numeric(_) => 1,
            Scalar::Complex(_) => 2,
            Scalar::Text(_) => 3,
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Numeric(a), Scalar::Numeric(b)) => canonical_bits(*a) == canonical_bits(*b),
            (Scalar::Complex(a), Scalar::Complex(b)) => {
                canonical_bits(a.re) == canonical_bits(b.re)
                    && canonical_bits(a.im) == canonical_bits(b.im)
            }
            (Scalar::Text(a), Scalar::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Scalar::Null => {}
            Scalar::Numeric(v) => canonical_bits(*v).hash(state),
            Scalar::Complex(c) => {
                canonical_bits(c.re).hash(state);
                canonical_bits(c.im).hash(state);
            }
            Scalar::Text(s) => s.hash(state),
        }
    }
}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scalar {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Scalar::Numeric(a), Scalar::Numeric(b)) => canonical_cmp(*a, *b),
            (Scalar::Complex(a), Scalar::Complex(b)) => {
                canonical_cmp(a.re, b.re).then_with(|| canonical_cmp(a.im, b.im))
            }
            (Scalar::Text(a), Scalar::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Numeric(v) => write!(f, "{v}"),
            Scalar::Complex(c) => write!(f, "{}{:+}j", c.re, c.im),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<Real> for Scalar {
    fn from(v: Real) -> Self {
        Scalar::Numeric(v)
    }
}

impl From<Complex> for Scalar {
    fn from(c: Complex) -> Self {
        Scalar::Complex(c)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

/// n-dimensional array cell. A 0-d array has an empty shape and one element.
#[derive(Debug, Clone, PartialEq)]
pub enum NdArray {
    Float(ArrayD<Real>),
    Complex(ArrayD<Complex>),
    Text(ArrayD<String>),
}

fn shaped<T>(shape: &[usize], values: Vec<T>) -> CoreResult<ArrayD<T>> {
    let len = values.len();
    ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|_| CoreError::ArrayShape {
        shape: shape.to_vec(),
        len,
    })
}

impl NdArray {
    /// Row-major float array; fails when `values` does not fill `shape`.
    pub fn float(shape: &[usize], values: Vec<Real>) -> CoreResult<Self> {
        shaped(shape, values).map(NdArray::Float)
    }

    pub fn complex(shape: &[usize], values: Vec<Complex>) -> CoreResult<Self> {
        shaped(shape, values).map(NdArray::Complex)
    }

    pub fn text(shape: &[usize], values: Vec<String>) -> CoreResult<Self> {
        shaped(shape, values).map(NdArray::Text)
    }

    /// One-dimensional float array.
    pub fn from_floats(values: Vec<Real>) -> Self {
        NdArray::Float(Array1::from(values).into_dyn())
    }

    // `shape` is taken from an existing array, so its size fits.
    pub fn full_float(shape: &[usize], value: Real) -> Self {
        NdArray::Float(ArrayD::from_elem(IxDyn(shape), value))
    }

    pub fn full_complex(shape: &[usize], value: Complex) -> Self {
        NdArray::Complex(ArrayD::from_elem(IxDyn(shape), value))
    }

    pub fn full_text(shape: &[usize], value: &str) -> Self {
        NdArray::Text(ArrayD::from_elem(IxDyn(shape), value.to_string()))
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            NdArray::Float(a) => a.shape(),
            NdArray::Complex(a) => a.shape(),
            NdArray::Text(a) => a.shape(),
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    pub fn len(&self) -> usize {
        match self {
            NdArray::Float(a) => a.len(),
            NdArray::Complex(a) => a.len(),
            NdArray::Text(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            NdArray::Float(_) => "numeric",
            NdArray::Complex(_) => "complex",
            NdArray::Text(_) => "text",
        }
    }

    /// Elements in logical row-major order, whatever the memory layout.
    pub fn scalars(&self) -> Box<dyn Iterator<Item = Scalar> + '_> {
        match self {
            NdArray::Float(a) => Box::new(a.iter().map(|v| Scalar::Numeric(*v))),
            NdArray::Complex(a) => Box::new(a.iter().map(|c| Scalar::Complex(*c))),
            NdArray::Text(a) => Box::new(a.iter().map(|s| Scalar::Text(s.clone()))),
        }
    }
}

/// One fetched results-table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Array(NdArray),
}

impl Value {
    pub fn null() -> Self {
        Value::Scalar(Scalar::Null)
    }

    pub fn shape(&self) -> Option<&[usize]> {
        match self {
            Value::Array(a) => Some(a.shape()),
            Value::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            Value::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&NdArray> {
        match self {
            Value::Array(a) => Some(a),
            Value::Scalar(_) => None,
        }
    }

    /// Number of elements this cell contributes when flattened.
    pub fn element_count(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::Array(a) => a.len(),
        }
    }

    /// Append this cell's elements in row-major order.
    pub fn flatten_into(&self, out: &mut Vec<Scalar>) {
        match self {
            Value::Scalar(s) => out.push(s.clone()),
            Value::Array(NdArray::Float(a)) => out.extend(a.iter().map(|v| Scalar::Numeric(*v))),
            Value::Array(NdArray::Complex(a)) => out.extend(a.iter().map(|c| Scalar::Complex(*c))),
            Value::Array(NdArray::Text(a)) => out.extend(a.iter().cloned().map(Scalar::Text)),
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<NdArray> for Value {
    fn from(a: NdArray) -> Self {
        Value::Array(a)
    }
}

impl From<Real> for Value {
    fn from(v: Real) -> Self {
        Value::Scalar(Scalar::Numeric(v))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(Scalar::Text(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn scalar_labels_fold_signed_zero_and_nan() {
        let mut set = HashSet::new();
        set.insert(Scalar::Numeric(0.0));
        set.insert(Scalar::Numeric(-0.0));
        set.insert(Scalar::Numeric(Real::NAN));
        set.insert(Scalar::Numeric(Real::NAN));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn scalar_order_ranks_kinds() {
        let mut values = vec![
            Scalar::from("b"),
            Scalar::Numeric(2.0),
            Scalar::Null,
            Scalar::from("a"),
            Scalar::Numeric(-1.0),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Scalar::Null,
                Scalar::Numeric(-1.0),
                Scalar::Numeric(2.0),
                Scalar::from("a"),
                Scalar::from("b"),
            ]
        );
    }

    #[test]
    fn ndarray_rejects_bad_shape() {
        let err = NdArray::float(&[2, 2], vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, CoreError::ArrayShape { len: 3, .. }));
    }

    #[test]
    fn oversized_shape_is_an_error() {
        let err = NdArray::float(&[usize::MAX, 2], Vec::new()).unwrap_err();
        assert!(matches!(err, CoreError::ArrayShape { len: 0, .. }));
    }

    #[test]
    fn zero_dim_array_holds_one_element() {
        let a = NdArray::float(&[], vec![4.0]).unwrap();
        assert_eq!(a.ndim(), 0);
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn full_arrays_repeat_the_value() {
        let a = NdArray::full_text(&[2, 3], "a");
        assert_eq!(a.shape(), &[2, 3]);
        assert!(a.scalars().all(|s| s == Scalar::from("a")));
    }

    #[test]
    fn flatten_appends_row_major() {
        let a = NdArray::float(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let mut out = Vec::new();
        Value::Array(a).flatten_into(&mut out);
        Value::from(5.0).flatten_into(&mut out);
        let floats: Vec<f64> = out.iter().filter_map(Scalar::as_f64).collect();
        assert_eq!(floats, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }
}
