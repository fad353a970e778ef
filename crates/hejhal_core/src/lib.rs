//! The `hejhal_core` crate locates Maass cusp forms on Γ0(N) with Hejhal's method.
//!
//! Levels of the form N = 2^r·p₁⋯p_k (r ≤ 3, distinct odd primes) are supported,
//! with trivial character and either parity.
//!
//! Key components:
//! - **Group**: coset representatives, cusps and parabolic vertices of Γ0(N).
//! - **Bessel**: the scaled kernel κ(r, u) = e^{πr/2}·K_{ir}(2πu) and its cache.
//! - **Domain / Horocycle**: pullback of horocycle samples to the fundamental domain.
//! - **System / Solvers**: the truncated linear system and its double-double solve.
//! - **Search**: linearized secant search over spectral parameters and sign assignments.
pub mod arith;
pub mod bessel;
pub mod domain;
pub mod error;
pub mod group;
pub mod hecke;
pub mod horocycle;
pub mod search;
pub mod signs;
pub mod solvers;
pub mod system;
pub mod traits;
pub mod truncation;

pub use error::HejhalError;
pub use group::{Cusp, GroupData, Sl2z};
pub use search::{
    find_eigenvalue, scan_range, EigenResult, ScanRequest, SearchRequest, SearchSettings,
};
pub use signs::SignAssignment;
pub use solvers::FourierCoefficients;
pub use system::Symmetry;
