//! Coset, cusp and parabolic-vertex data for Γ0(N).
//!
//! Supported levels are N = 2^r·p₁⋯p_k with r ≤ 3 and distinct odd primes p_i.
//! For those levels the classes of cusps are represented by ∞, 0, and 1/d for
//! the proper divisors 1 < d < N, which is the list [`GroupData::cusps`] holds.

pub mod cusp;
pub mod matrix;

use std::collections::HashSet;

use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::arith::{divisors, extended_gcd, factorize, gcd, psi};
use crate::error::{HejhalError, Result};

pub use cusp::Cusp;
pub use matrix::Sl2z;

/// The cusp normalizer σ_c = ρ_c·diag(√w, 1/√w) of a cusp of width w.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CuspNormalizer {
    /// Integer part ρ_c, with ρ_c(∞) = c.
    pub rho: Sl2z,
    pub width: u64,
}

impl CuspNormalizer {
    /// ρ_c and the width of `cusp` on Γ0(level).
    ///
    /// The width of a/d is N/gcd(d², N), the smallest w with ρ_c·T^w·ρ_c⁻¹ in Γ0(N).
    /// This is smaller than N/d exactly when gcd(d, N/d) > 1, which for the accepted
    /// levels means d is even and 2d | N: at level 4 the cusp 1/2 has width 1, and at
    /// level 8 it has width 2 rather than 4.
    pub fn for_cusp(cusp: &Cusp, level: u64) -> Self {
        match *cusp {
            Cusp::Infinity => Self {
                rho: Sl2z::IDENTITY,
                width: 1,
            },
            Cusp::Rational { num, den } => {
                let (_, x, y) = extended_gcd(num, den);
                let square = (den as u64).pow(2);
                Self {
                    rho: Sl2z::new(num, -y, den, x),
                    width: level / gcd(square as i64, level as i64) as u64,
                }
            }
        }
    }

    /// σ⁻¹·z
    pub fn to_local(&self, z: Complex<f64>) -> Complex<f64> {
        self.rho.inverse().act(z) / self.width as f64
    }

    /// σ·z
    pub fn from_local(&self, z: Complex<f64>) -> Complex<f64> {
        self.rho.act(z * self.width as f64)
    }
}

/// A parabolic vertex of the fundamental domain together with the map to its cusp class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexData {
    pub vertex: Cusp,
    /// Representative of the class of `vertex` in [`GroupData::cusps`].
    pub cusp: Cusp,
    pub cusp_index: usize,
    /// U_v ∈ Γ0(N) with U_v(vertex) = cusp.
    pub u: Sl2z,
    pub normalizer: CuspNormalizer,
}

impl VertexData {
    /// σ_v⁻¹·U_v·w, whose imaginary part is the height of `w` seen from this vertex.
    pub fn local(&self, w: Complex<f64>) -> Complex<f64> {
        self.normalizer.to_local(self.u.act(w))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupData {
    level: u64,
    coset_reps: Vec<Sl2z>,
    cusps: Vec<Cusp>,
    vertices: Vec<VertexData>,
}

impl GroupData {
    pub fn build(level: u64) -> Result<Self> {
        validate_level(level)?;
        let coset_reps = coset_representatives(level);
        if coset_reps.len() as u64 != psi(level) {
            return Err(HejhalError::InconsistentGroupData {
                level,
                reason: format!(
                    "found {} coset representatives, expected {}",
                    coset_reps.len(),
                    psi(level)
                ),
            });
        }

        let mut cusps = vec![Cusp::Infinity];
        if level > 1 {
            cusps.push(Cusp::zero());
        }
        cusps.extend(
            divisors(level)
                .into_iter()
                .filter(|&d| d > 1 && d < level)
                .map(|d| Cusp::new(1, d as i64)),
        );

        let mut seen = HashSet::new();
        let mut vertices = Vec::new();
        for rep in &coset_reps {
            let vertex = rep.vertex();
            if seen.insert(vertex) {
                vertices.push(vertex_data(vertex, &cusps, level)?);
            }
        }

        for cusp in cusps.iter().skip(1).filter(|c| !c.is_zero()) {
            if !seen.contains(cusp) {
                return Err(HejhalError::InconsistentGroupData {
                    level,
                    reason: format!("cusp {cusp} is not a parabolic vertex"),
                });
            }
        }

        Ok(Self {
            level,
            coset_reps,
            cusps,
            vertices,
        })
    }

    pub fn level(&self) -> u64 {
        self.level
    }

    /// Index of Γ0(N) in SL2(Z).
    pub fn index(&self) -> usize {
        self.coset_reps.len()
    }

    pub fn coset_reps(&self) -> &[Sl2z] {
        &self.coset_reps
    }

    pub fn cusps(&self) -> &[Cusp] {
        &self.cusps
    }

    pub fn vertices(&self) -> &[VertexData] {
        &self.vertices
    }

    pub fn parabolic_vertices(&self) -> impl Iterator<Item = &Cusp> {
        self.vertices.iter().map(|v| &v.vertex)
    }

    pub fn cusp_width(&self, cusp: &Cusp) -> u64 {
        CuspNormalizer::for_cusp(cusp, self.level).width
    }

    pub fn normalizer(&self, cusp: &Cusp) -> CuspNormalizer {
        CuspNormalizer::for_cusp(cusp, self.level)
    }
}

fn validate_level(level: u64) -> Result<()> {
    let invalid = |reason: &str| HejhalError::InvalidLevel {
        level,
        reason: reason.to_string(),
    };
    if level == 0 {
        return Err(invalid("level must be positive"));
    }
    if level > i32::MAX as u64 {
        return Err(invalid("level is too large"));
    }
    for (p, exp) in factorize(level) {
        if p == 2 && exp > 3 {
            return Err(invalid("power of two exceeds 8"));
        }
        if p != 2 && exp > 1 {
            return Err(invalid("odd part is not squarefree"));
        }
    }
    Ok(())
}

/// Complete invariant of the class of (c : d) in P¹(Z/N).
///
/// With g = gcd(c, N) every class contains (g : d') for some d', and d' is
/// determined modulo N/g, where it equals d·(c/g)⁻¹.
fn projective_key(c: i64, d: i64, n: i64) -> (i64, i64) {
    let c = c.rem_euclid(n);
    let g = gcd(c, n);
    let m = n / g;
    let (_, inverse, _) = extended_gcd((c / g) % m, m);
    (g, (d.rem_euclid(m) * inverse.rem_euclid(m)) % m)
}

/// A matrix of SL2(Z) with bottom row congruent to (c, d) modulo N.
fn lift_bottom_row(c: i64, d: i64, n: i64) -> Sl2z {
    let c = match c.rem_euclid(n) {
        0 => n,
        c => c,
    };
    let mut d = d.rem_euclid(n);
    while gcd(c, d) != 1 {
        d += n;
    }
    let (_, x, y) = extended_gcd(c, d);
    Sl2z::new(y, -x, c, d)
}

/// Right coset representatives of Γ0(N), one per class of P¹(Z/N).
///
/// The identity comes first, followed by S·T^j for 0 ≤ j < N, then the lower
/// triangular matrices (1 0; d 1) for proper divisors d, then one lift of
/// (d : e) for each remaining class, d running over the proper divisors.
fn coset_representatives(level: u64) -> Vec<Sl2z> {
    let n = level as i64;
    if n == 1 {
        return vec![Sl2z::IDENTITY];
    }
    let proper: Vec<i64> = divisors(level)
        .into_iter()
        .map(|d| d as i64)
        .filter(|&d| d > 1 && d < n)
        .collect();

    let mut seen = HashSet::new();
    let mut reps = vec![Sl2z::IDENTITY];
    seen.insert(projective_key(0, 1, n));

    for j in 0..n {
        if seen.insert(projective_key(1, j, n)) {
            reps.push(Sl2z::new(0, -1, 1, j));
        }
    }
    for &d in &proper {
        if seen.insert(projective_key(d, 1, n)) {
            reps.push(Sl2z::new(1, 0, d, 1));
        }
    }
    for &c in &proper {
        for d in 0..n {
            if gcd(gcd(c, d), n) == 1 && seen.insert(projective_key(c, d, n)) {
                reps.push(lift_bottom_row(c, d, n));
            }
        }
    }
    reps
}

fn vertex_data(vertex: Cusp, cusps: &[Cusp], level: u64) -> Result<VertexData> {
    let n = level as i64;
    let to_vertex = CuspNormalizer::for_cusp(&vertex, level).rho;
    for (cusp_index, cusp) in cusps.iter().enumerate() {
        let normalizer = CuspNormalizer::for_cusp(cusp, level);
        for j in 0..n {
            let u = normalizer.rho * Sl2z::translation(j) * to_vertex.inverse();
            if u.in_gamma0(level) {
                return Ok(VertexData {
                    vertex,
                    cusp: *cusp,
                    cusp_index,
                    u,
                    normalizer,
                });
            }
        }
    }
    Err(HejhalError::InconsistentGroupData {
        level,
        reason: format!("vertex {vertex} is not equivalent to any listed cusp"),
    })
}
