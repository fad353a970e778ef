use std::f64::consts::PI;

use statrs::function::gamma::gamma_ur;

use crate::error::{HejhalError, Result};

/// Truncation points are searched below this bound.
pub const MAX_TRUNCATION: usize = 10_000;

/// Bound on the Fourier tail Σ_{n>m} |a(n)·√Y·κ(R, nY)| used to pick the truncation point.
///
/// Equals Γ(½, 2πmY)/√(πY), written through the regularized upper incomplete gamma.
pub fn tail_bound(m: usize, y: f64) -> f64 {
    let x = 2.0 * PI * m as f64 * y;
    gamma_ur(0.5, x) / y.sqrt()
}

/// Smallest m past the transition region of κ(R, ·Y) whose tail bound drops below `eps`.
pub fn truncation(r: f64, y: f64, eps: f64) -> Result<usize> {
    let not_found = HejhalError::TruncationNotFound {
        r,
        y,
        limit: MAX_TRUNCATION,
    };
    if !(y > 0.0) || !(eps > 0.0) || !r.is_finite() {
        return Err(not_found);
    }
    let start = ((12.0 * r.abs().cbrt() + r.abs()) / (2.0 * PI * y)).ceil();
    let start = if start.is_finite() { start.max(1.0) as usize } else { MAX_TRUNCATION };
    (start..MAX_TRUNCATION)
        .find(|&m| tail_bound(m, y) < eps)
        .ok_or(not_found)
}
