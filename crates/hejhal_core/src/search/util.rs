//! Helpers for the linearized search.

use anyhow::{bail, Result};
use nalgebra::DMatrix;
use num_complex::Complex;
use twofloat::TwoFloat;

use crate::solvers::{FourierCoefficients, LuFactorization};
use crate::traits::Scalar;

/// Largest absolute entry of each column, 1 for columns without a finite nonzero entry.
pub fn column_scales(mat: &DMatrix<f64>) -> Vec<f64> {
    mat.column_iter()
        .map(|col| {
            let scale = col.amax();
            if scale > 0.0 && scale.is_finite() {
                scale
            } else {
                1.0
            }
        })
        .collect()
}

/// Divides column j of `mat` by `scales[j]`.
pub fn divide_columns(mut mat: DMatrix<f64>, scales: &[f64]) -> DMatrix<f64> {
    for (mut col, &scale) in mat.column_iter_mut().zip(scales) {
        col /= scale;
    }
    mat
}

/// L = M'⁻¹·M, solved in double-double from matrices assembled in f64.
pub fn linearize(
    derivative: &DMatrix<f64>,
    m: &DMatrix<f64>,
) -> crate::error::Result<DMatrix<f64>> {
    let lu = LuFactorization::new(
        derivative.map(|v| -> TwoFloat { v.into() }),
        f64::unit_roundoff(),
    )?;
    let solved = lu.solve_matrix(&m.map(|v| -> TwoFloat { v.into() }))?;
    Ok(solved.map(|v| -> f64 { v.into() }))
}

/// Eigenvalues of a square matrix. Fails on non-finite entries.
pub fn compute_eigenvalues(mat: &DMatrix<f64>) -> Result<Vec<Complex<f64>>> {
    if mat.nrows() == 0 {
        return Ok(Vec::new());
    }
    if mat.iter().any(|v| !v.is_finite()) {
        bail!("Cannot compute eigenvalues of a matrix with non-finite entries.");
    }

    let eigen = mat.clone().complex_eigenvalues();
    Ok(eigen.iter().cloned().collect())
}

/// Σ |a(n) − b(n)| over the first `count` unknowns present in both vectors.
pub fn coefficient_spread(a: &FourierCoefficients, b: &FourierCoefficients, count: usize) -> f64 {
    a.unknowns()
        .iter()
        .zip(b.unknowns())
        .take(count)
        .map(|(x, y)| (x - y).abs())
        .sum()
}
