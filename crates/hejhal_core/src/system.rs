//! Assembly of Hejhal's linear system from horocycle samples.
//!
//! With cs = cos (even forms) or sin (odd forms) and Q samples,
//!
//! V(n,k) = (2/Q)·Σ_m ε(c_m)·√y*_m·κ(R, k·y*_m)·cs(2πk·x*_m)·cs(2πn·x_m),
//!
//! and the coefficients satisfy Σ_k a(k)·[V(n,k) − δ_{nk}·√Y·κ(R, nY)] ≈ 0 for n < Q.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::bessel::BesselEvaluator;
use crate::error::Result;
use crate::horocycle::MaassSpace;
use crate::signs::SignAssignment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symmetry {
    /// Cosine expansion, f(-z̄) = f(z).
    Even,
    /// Sine expansion, f(-z̄) = -f(z).
    Odd,
}

impl Symmetry {
    /// +1 selects the even and -1 the odd expansion.
    pub fn from_flag(flag: i8) -> Option<Self> {
        match flag {
            1 => Some(Symmetry::Even),
            -1 => Some(Symmetry::Odd),
            _ => None,
        }
    }

    pub fn flag(&self) -> i8 {
        match self {
            Symmetry::Even => 1,
            Symmetry::Odd => -1,
        }
    }

    pub fn harmonic(&self, t: f64) -> f64 {
        match self {
            Symmetry::Even => t.cos(),
            Symmetry::Odd => t.sin(),
        }
    }
}

/// Sign-independent factors of V, one row per sample.
struct SampleKernel {
    /// cs(2πn·x_m), Q × (Q-1)
    harmonics: DMatrix<f64>,
    /// √y*_m·κ(R, k·y*_m)·cs(2πk·x*_m), Q × (Q-1)
    kernel: DMatrix<f64>,
}

impl SampleKernel {
    fn new(r: f64, space: &MaassSpace, symmetry: Symmetry, bessel: &mut BesselEvaluator) -> Self {
        let q = space.size();
        let samples = space.samples();
        let harmonics = DMatrix::from_fn(q, q - 1, |m, n| {
            symmetry.harmonic(2.0 * PI * (n + 1) as f64 * samples[m].z.re)
        });
        let mut kernel = DMatrix::zeros(q, q - 1);
        for (m, point) in samples.iter().enumerate() {
            let y = point.local.im;
            let root = y.sqrt();
            for k in 1..q {
                let kf = k as f64;
                kernel[(m, k - 1)] =
                    root * bessel.kappa(r, kf * y) * symmetry.harmonic(2.0 * PI * kf * point.local.re);
            }
        }
        Self { harmonics, kernel }
    }

    fn sign_column(space: &MaassSpace, signs: &SignAssignment) -> Result<DVector<f64>> {
        let values = space
            .samples()
            .iter()
            .map(|p| signs.require(&p.cusp).map(f64::from))
            .collect::<Result<Vec<_>>>()?;
        Ok(DVector::from_vec(values))
    }

    fn coefficient_map(&self, signs: &DVector<f64>) -> DMatrix<f64> {
        let q = self.kernel.nrows();
        let mut weighted = self.kernel.clone();
        for (m, sign) in signs.iter().enumerate() {
            weighted.row_mut(m).scale_mut(*sign);
        }
        self.harmonics.transpose() * weighted * (2.0 / q as f64)
    }
}

fn subtract_diagonal(
    mut v: DMatrix<f64>,
    r: f64,
    space: &MaassSpace,
    bessel: &mut BesselEvaluator,
) -> DMatrix<f64> {
    let y = space.height();
    for n in 1..space.size() {
        v[(n - 1, n - 1)] -= y.sqrt() * bessel.kappa(r, n as f64 * y);
    }
    v
}

/// V(n,k) for 1 ≤ n, k < Q; entry (n-1, k-1) holds V(n,k).
pub fn coefficient_map(
    r: f64,
    space: &MaassSpace,
    symmetry: Symmetry,
    signs: &SignAssignment,
    bessel: &mut BesselEvaluator,
) -> Result<DMatrix<f64>> {
    let sign_column = SampleKernel::sign_column(space, signs)?;
    Ok(SampleKernel::new(r, space, symmetry, bessel).coefficient_map(&sign_column))
}

/// The (Q-1) × (Q-1) matrix M(R) with M[n,k] = V(n,k) − δ_{nk}·√Y·κ(R, nY).
pub fn full_matrix(
    r: f64,
    space: &MaassSpace,
    symmetry: Symmetry,
    signs: &SignAssignment,
    bessel: &mut BesselEvaluator,
) -> Result<DMatrix<f64>> {
    let v = coefficient_map(r, space, symmetry, signs, bessel)?;
    Ok(subtract_diagonal(v, r, space, bessel))
}

/// [`full_matrix`] for several sign assignments sharing one Bessel pass.
pub fn batched_full_matrices(
    r: f64,
    space: &MaassSpace,
    symmetry: Symmetry,
    assignments: &[SignAssignment],
    bessel: &mut BesselEvaluator,
) -> Result<Vec<DMatrix<f64>>> {
    let columns = assignments
        .iter()
        .map(|signs| SampleKernel::sign_column(space, signs))
        .collect::<Result<Vec<_>>>()?;
    let kernel = SampleKernel::new(r, space, symmetry, bessel);
    Ok(columns
        .iter()
        .map(|column| subtract_diagonal(kernel.coefficient_map(column), r, space, bessel))
        .collect())
}

/// The system for a(2), …, a(Q-1) after fixing a(1) = 1.
///
/// Drops the first row and column of the full matrix and moves its first column
/// to the right-hand side.
pub fn normalized_system(
    r: f64,
    space: &MaassSpace,
    symmetry: Symmetry,
    signs: &SignAssignment,
    bessel: &mut BesselEvaluator,
) -> Result<(DMatrix<f64>, DVector<f64>)> {
    let full = full_matrix(r, space, symmetry, signs, bessel)?;
    Ok(split_normalized(&full))
}

pub(crate) fn split_normalized(full: &DMatrix<f64>) -> (DMatrix<f64>, DVector<f64>) {
    let n = full.nrows() - 1;
    let a = full.view((1, 1), (n, n)).into_owned();
    let b = DVector::from_fn(n, |i, _| -full[(i + 1, 0)]);
    (a, b)
}
