use anyhow::Result;
use nalgebra::DMatrix;

use crate::bessel::BesselEvaluator;
use crate::horocycle::MaassSpace;
use crate::signs::SignAssignment;
use crate::solvers::{solve, FourierCoefficients};
use crate::system::{full_matrix, Symmetry};

/// Which of the two independent discretizations to solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discretization {
    Primary,
    /// The lower horocycle used to confirm a candidate.
    Secondary,
}

/// Core interface of anything the linearized secant search can locate roots of.
///
/// Eigenvalues are the values of R at which `system_matrix` becomes singular.
pub trait SpectralProblem {
    /// The square matrix M(R).
    fn system_matrix(&mut self, r: f64) -> Result<DMatrix<f64>>;

    /// Coefficients of the solution at R, computed from the selected discretization.
    fn coefficients(&mut self, r: f64, discretization: Discretization) -> Result<FourierCoefficients>;

    /// Hook invoked after every processed candidate.
    fn on_iteration(&mut self, _iteration: usize, _guess: f64, _radius: f64) {}
}

/// Maass forms on Γ0(N) with fixed symmetry and cusp signs.
pub struct MaassProblem<'a> {
    primary: &'a MaassSpace,
    secondary: &'a MaassSpace,
    symmetry: Symmetry,
    signs: &'a SignAssignment,
    bessel: &'a mut BesselEvaluator,
}

impl<'a> MaassProblem<'a> {
    pub fn new(
        primary: &'a MaassSpace,
        secondary: &'a MaassSpace,
        symmetry: Symmetry,
        signs: &'a SignAssignment,
        bessel: &'a mut BesselEvaluator,
    ) -> Self {
        Self {
            primary,
            secondary,
            symmetry,
            signs,
            bessel,
        }
    }
}

impl SpectralProblem for MaassProblem<'_> {
    fn system_matrix(&mut self, r: f64) -> Result<DMatrix<f64>> {
        Ok(full_matrix(
            r,
            self.primary,
            self.symmetry,
            self.signs,
            self.bessel,
        )?)
    }

    fn coefficients(&mut self, r: f64, discretization: Discretization) -> Result<FourierCoefficients> {
        let space = match discretization {
            Discretization::Primary => self.primary,
            Discretization::Secondary => self.secondary,
        };
        Ok(solve(
            space.height(),
            r,
            space,
            self.signs,
            self.symmetry,
            self.bessel,
        )?)
    }
}
