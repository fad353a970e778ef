//! Settings, requests and results for the eigenvalue search.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::horocycle::SpaceSettings;
use crate::signs::SignAssignment;
use crate::solvers::FourierCoefficients;
use crate::system::Symmetry;

/// Tolerances and limits for the linearized secant search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Candidates whose radius falls below this are verified instead of split.
    pub error_bound: f64,
    /// Maximum summed difference of the compared coefficients at the two heights.
    pub coefficient_tolerance: f64,
    /// Number of unknowns a(2), a(3), … compared during verification.
    pub compared_coefficients: usize,
    /// Step of the forward difference approximating dM/dR.
    pub secant_step: f64,
    /// The verification height is this fraction of the primary height.
    pub secondary_height_factor: f64,
    /// Total number of candidates processed before giving up.
    pub max_iterations: usize,
    /// Capacity of the κ cache, `None` to evaluate without caching.
    pub cache_capacity: Option<usize>,
    /// Try every sign pattern on the cusps instead of only the multiplicative ones.
    pub exhaustive_signs: bool,
    /// Scan results closer than this are reported once.
    pub dedup_tolerance: f64,
    pub space: SpaceSettings,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            error_bound: 1e-7,
            coefficient_tolerance: 1e-5,
            compared_coefficients: 4,
            secant_step: 1e-10,
            secondary_height_factor: 0.9,
            max_iterations: 200,
            cache_capacity: Some(crate::bessel::DEFAULT_CACHE_CAPACITY),
            exhaustive_signs: false,
            dedup_tolerance: 1e-6,
            space: SpaceSettings::default(),
        }
    }
}

impl SearchSettings {
    pub fn validate(&self) -> Result<()> {
        if self.error_bound <= 0.0 {
            bail!("error_bound must be positive.");
        }
        if self.coefficient_tolerance <= 0.0 {
            bail!("coefficient_tolerance must be positive.");
        }
        if self.compared_coefficients == 0 {
            bail!("compared_coefficients must be greater than zero.");
        }
        if self.secant_step <= 0.0 {
            bail!("secant_step must be positive.");
        }
        if !(self.secondary_height_factor > 0.0 && self.secondary_height_factor < 1.0) {
            bail!("secondary_height_factor must lie strictly between 0 and 1.");
        }
        if self.max_iterations == 0 {
            bail!("max_iterations must be greater than zero.");
        }
        if self.dedup_tolerance < 0.0 {
            bail!("dedup_tolerance must be non-negative.");
        }
        if !(self.space.height_factor > 0.0 && self.space.height_factor < 1.0) {
            bail!("height_factor must lie strictly between 0 and 1.");
        }
        if self.space.truncation_eps <= 0.0 {
            bail!("truncation_eps must be positive.");
        }
        Ok(())
    }
}

/// A point of the search worklist: an approximate R and the radius it is trusted to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub guess: f64,
    pub radius: f64,
}

/// Outcome of a successful linearized search for one problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearizedRoot {
    pub r: f64,
    pub coefficients: FourierCoefficients,
    /// Summed difference of the compared coefficients at the two heights.
    pub spread: f64,
    pub iterations: usize,
}

/// Search around a single seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub level: u64,
    pub guess: f64,
    pub radius: f64,
    pub symmetry: Symmetry,
    /// Fixed signs; when absent the enumerated assignments are tried in order.
    pub signs: Option<SignAssignment>,
    pub settings: SearchSettings,
}

/// Search over the interval [start, end] in windows of width `step`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub level: u64,
    pub start: f64,
    pub end: f64,
    pub step: f64,
    pub symmetry: Symmetry,
    pub signs: Option<SignAssignment>,
    pub settings: SearchSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EigenResult {
    pub level: u64,
    pub r: f64,
    pub symmetry: Symmetry,
    pub signs: SignAssignment,
    pub coefficients: FourierCoefficients,
    pub spread: f64,
    pub iterations: usize,
}
