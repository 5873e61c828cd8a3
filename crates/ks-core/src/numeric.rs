use crate::CoreError;

/// Floating point type used throughout system
pub type Real = f64;

/// Absolute/relative tolerance pair.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Tolerances {
    pub const fn new(rel: Real, abs: Real) -> Self {
        Self { abs, rel }
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, CoreError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(CoreError::NonPositive { what, value: v })
    }
}

/// Evenly spaced points on `[start, stop]`, both ends included.
pub fn linspace(start: Real, stop: Real, points: usize) -> Vec<Real> {
    match points {
        0 => Vec::new(),
        1 => vec![start],
        n => {
            let step = (stop - start) / (n - 1) as Real;
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + step * i as Real })
                .collect()
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn linspace_is_monotone(len in 0.1_f64..10.0, n in 2_usize..200) {
            let grid = linspace(0.0, len, n);
            prop_assert_eq!(grid.len(), n);
            prop_assert!(grid.windows(2).all(|w| w[1] > w[0]));
            prop_assert_eq!(grid[n - 1], len);
        }
    }
}
