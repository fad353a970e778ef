//! Dense linear solves for the coefficient system.
//!
//! The normalized system is solved in double-double precision: the matrix is
//! nearly singular close to an eigenvalue, and the extra digits keep the low
//! order coefficients stable there.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use twofloat::TwoFloat;

use crate::bessel::BesselEvaluator;
use crate::error::{HejhalError, Result};
use crate::horocycle::MaassSpace;
use crate::signs::SignAssignment;
use crate::system::{normalized_system, Symmetry};
use crate::traits::Scalar;

/// Allowed difference between the requested height and the sampled one.
pub const HEIGHT_TOLERANCE: f64 = 1e-5;

/// Row-pivoted LU factorization P·A = L·U carried out in the precision of `T`.
#[derive(Debug, Clone)]
pub struct LuFactorization<T: Scalar> {
    lu: DMatrix<T>,
    perm: Vec<usize>,
}

impl<T: Scalar> LuFactorization<T> {
    /// Factors `a`, whose entries carry a relative error of `data_roundoff`.
    ///
    /// A pivot no larger than n·max(ε, u)·max|A[.,j]| is treated as zero, where ε is
    /// `data_roundoff`, u the unit roundoff of `T` and A[.,j] the pivot's column of the
    /// input. The test is column relative, so rescaling a column leaves the verdict unchanged.
    pub fn new(mut a: DMatrix<T>, data_roundoff: f64) -> Result<Self> {
        let n = a.nrows();
        if n != a.ncols() {
            return Err(HejhalError::SingularSystem {
                size: n,
                column: 0,
                pivot: 0.0,
            });
        }

        let roundoff = data_roundoff.max(T::unit_roundoff());
        let thresholds: Vec<f64> = a
            .column_iter()
            .map(|col| {
                let scale = col.iter().fold(0.0f64, |acc, v| acc.max(v.abs().into()));
                n as f64 * roundoff * scale
            })
            .collect();
        let mut perm: Vec<usize> = (0..n).collect();

        for col in 0..n {
            let mut pivot_row = col;
            let mut pivot_abs = a[(col, col)].abs();
            for row in col + 1..n {
                let candidate = a[(row, col)].abs();
                if candidate > pivot_abs {
                    pivot_row = row;
                    pivot_abs = candidate;
                }
            }
            let pivot_value: f64 = pivot_abs.into();
            if !(pivot_value > thresholds[col]) {
                return Err(HejhalError::SingularSystem {
                    size: n,
                    column: col,
                    pivot: pivot_value,
                });
            }
            if pivot_row != col {
                a.swap_rows(pivot_row, col);
                perm.swap(pivot_row, col);
            }

            let pivot = a[(col, col)];
            for row in col + 1..n {
                let factor = a[(row, col)] / pivot;
                a[(row, col)] = factor;
                if factor == T::zero() {
                    continue;
                }
                for k in col + 1..n {
                    let update = factor * a[(col, k)];
                    a[(row, k)] = a[(row, k)] - update;
                }
            }
        }

        Ok(Self { lu: a, perm })
    }

    pub fn dim(&self) -> usize {
        self.perm.len()
    }

    /// Solves A·x = b.
    pub fn solve_vector(&self, b: &DVector<T>) -> Result<DVector<T>> {
        self.check_rows(b.len())?;
        let mut x = DVector::from_fn(b.len(), |i, _| b[self.perm[i]]);
        self.substitute(x.as_mut_slice());
        Ok(x)
    }

    /// Solves A·X = B column by column.
    pub fn solve_matrix(&self, b: &DMatrix<T>) -> Result<DMatrix<T>> {
        self.check_rows(b.nrows())?;
        let mut x = DMatrix::from_fn(b.nrows(), b.ncols(), |i, j| b[(self.perm[i], j)]);
        for j in 0..x.ncols() {
            let mut column = x.column(j).clone_owned();
            self.substitute(column.as_mut_slice());
            x.set_column(j, &column);
        }
        Ok(x)
    }

    fn check_rows(&self, rows: usize) -> Result<()> {
        if rows == self.dim() {
            Ok(())
        } else {
            Err(HejhalError::SingularSystem {
                size: self.dim(),
                column: 0,
                pivot: 0.0,
            })
        }
    }

    // Forward then back substitution on an already permuted right-hand side.
    fn substitute(&self, x: &mut [T]) {
        let n = self.dim();
        for row in 0..n {
            let mut acc = x[row];
            for k in 0..row {
                acc = acc - self.lu[(row, k)] * x[k];
            }
            x[row] = acc;
        }
        for row in (0..n).rev() {
            let mut acc = x[row];
            for k in row + 1..n {
                acc = acc - self.lu[(row, k)] * x[k];
            }
            x[row] = acc / self.lu[(row, row)];
        }
    }
}

/// Solves A·x = b for data known to `data_roundoff`, see [`LuFactorization::new`].
pub fn lu_solve<T: Scalar>(a: DMatrix<T>, b: DVector<T>, data_roundoff: f64) -> Result<DVector<T>> {
    LuFactorization::new(a, data_roundoff)?.solve_vector(&b)
}

/// Normalized Fourier coefficients a(1) = 1, a(2), …, a(Q-1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FourierCoefficients {
    values: Vec<f64>,
}

impl FourierCoefficients {
    /// Wraps the solved unknowns a(2), a(3), … behind the normalization a(1) = 1.
    pub fn from_unknowns(unknowns: impl IntoIterator<Item = f64>) -> Self {
        let mut values = vec![1.0];
        values.extend(unknowns);
        Self { values }
    }

    /// a(n) for n ≥ 1.
    pub fn a(&self, n: usize) -> Option<f64> {
        n.checked_sub(1).and_then(|i| self.values.get(i)).copied()
    }

    /// a(2), a(3), …
    pub fn unknowns(&self) -> &[f64] {
        &self.values[1..]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Largest n with a(n) available.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Solves for the coefficients of a form with spectral parameter `r` from the samples at `height`.
pub fn solve(
    height: f64,
    r: f64,
    space: &MaassSpace,
    signs: &SignAssignment,
    symmetry: Symmetry,
    bessel: &mut BesselEvaluator,
) -> Result<FourierCoefficients> {
    let sampled = space.samples().first().map_or(space.height(), |p| p.z.im);
    if (sampled - height).abs() > HEIGHT_TOLERANCE {
        return Err(HejhalError::HeightMismatch {
            expected: height,
            actual: sampled,
        });
    }

    let (a, b) = normalized_system(r, space, symmetry, signs, bessel)?;
    let a = a.map(|v| -> TwoFloat { v.into() });
    let b = b.map(|v| -> TwoFloat { v.into() });
    // assembled in f64
    let x = lu_solve(a, b, f64::unit_roundoff())?;
    Ok(FourierCoefficients::from_unknowns(x.iter().map(|&v| f64::from(v))))
}
