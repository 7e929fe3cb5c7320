/// Floating point type used for every numeric cell.
pub type Real = f64;

/// Complex cell type.
pub type Complex = nalgebra::Complex<Real>;

/// Bit pattern used when a float acts as a label: `-0.0` folds onto `0.0` and
/// every NaN folds onto one quiet NaN.
pub fn canonical_bits(v: Real) -> u64 {
    if v.is_nan() {
        Real::NAN.to_bits()
    } else if v == 0.0 {
        0.0_f64.to_bits()
    } else {
        v.to_bits()
    }
}

/// Total order consistent with [`canonical_bits`] equality.
pub fn canonical_cmp(a: Real, b: Real) -> core::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => core::cmp::Ordering::Equal,
        (true, false) => core::cmp::Ordering::Greater,
        (false, true) => core::cmp::Ordering::Less,
        // -0.0 == 0.0 under partial_cmp
        (false, false) => a.partial_cmp(&b).unwrap_or(core::cmp::Ordering::Equal),
    }
}
