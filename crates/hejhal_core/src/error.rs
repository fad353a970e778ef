//! Error taxonomy shared by the numerical building blocks.
//!
//! Leaf modules return [`HejhalError`]; the search layer lifts these into
//! `anyhow::Error` with context, except for the variants it treats as a
//! rejected branch (see [`HejhalError::is_recoverable`]).

/// Failures raised by group construction, geometry, and the linear solvers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HejhalError {
    /// The level is zero, divisible by 16, or has a repeated odd prime factor.
    #[error("Invalid level {level}: {reason}")]
    InvalidLevel { level: u64, reason: String },

    /// Reduction into the standard domain did not terminate.
    #[error("Pullback of {re} + {im}i did not reach the fundamental domain after {iterations} steps.")]
    PullbackDivergence { re: f64, im: f64, iterations: usize },

    /// The incomplete gamma tail never dropped below the requested epsilon.
    #[error("No truncation point below {limit} for R = {r}, Y = {y}.")]
    TruncationNotFound { r: f64, y: f64, limit: usize },

    /// The sampled horocycle does not lie at the requested height.
    #[error("Sample height {actual} does not match requested height {expected}.")]
    HeightMismatch { expected: f64, actual: f64 },

    /// LU factorization hit a pivot below the working precision.
    #[error("Linear system of size {size} is numerically singular (pivot {pivot:e} at column {column}).")]
    SingularSystem {
        size: usize,
        column: usize,
        pivot: f64,
    },

    /// Cusp and vertex data violate the structural invariants of Γ0(N).
    #[error("Inconsistent group data for level {level}: {reason}")]
    InconsistentGroupData { level: u64, reason: String },

    /// A horocycle sample landed at a cusp missing from the sign assignment.
    #[error("No sign assigned to cusp {cusp}.")]
    UnsignedCusp { cusp: String },
}

impl HejhalError {
    /// Errors after which the search drops the current branch and keeps going.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, HejhalError::SingularSystem { .. })
    }
}

pub type Result<T> = std::result::Result<T, HejhalError>;
