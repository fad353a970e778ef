//! Pullback of points in the upper half-plane to fundamental domains.

use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::error::{HejhalError, Result};
use crate::group::{Cusp, GroupData, Sl2z};

/// Iteration cap for [`reduce_to_std_domain`].
pub const MAX_REDUCTION_STEPS: usize = 10_000;

const REAL_PART_BOUND: f64 = 0.501;
const MODULUS_BOUND: f64 = 0.999;

fn in_std_domain(z: Complex<f64>) -> bool {
    z.re.abs() <= REAL_PART_BOUND && z.norm() >= MODULUS_BOUND
}

/// Maps `z` into the standard fundamental domain of SL2(Z).
///
/// Returns (γ, z*) with γ·z = z*. Points already inside the (slightly enlarged)
/// domain come back unchanged with the identity.
pub fn reduce_to_std_domain(z: Complex<f64>) -> Result<(Sl2z, Complex<f64>)> {
    let divergence = |iterations| HejhalError::PullbackDivergence {
        re: z.re,
        im: z.im,
        iterations,
    };
    if !(z.im > 0.0) || !z.re.is_finite() {
        return Err(divergence(0));
    }

    let mut gamma = Sl2z::IDENTITY;
    let mut w = z;
    for _ in 0..MAX_REDUCTION_STEPS {
        if in_std_domain(w) {
            return Ok((gamma, w));
        }
        let shift = w.re.round();
        if shift != 0.0 {
            w.re -= shift;
            gamma = Sl2z::translation(-(shift as i64)) * gamma;
        }
        if w.norm_sqr() < 1.0 {
            w = -w.inv();
            gamma = Sl2z::S * gamma;
        }
    }
    Err(divergence(MAX_REDUCTION_STEPS))
}

/// Maps `z` into the fundamental domain of Γ0(N) built from the coset representatives.
///
/// Returns (γ', w) with γ' ∈ Γ0(N) and γ'·z = w.
pub fn reduce_to_subgroup_domain(
    z: Complex<f64>,
    group: &GroupData,
) -> Result<(Sl2z, Complex<f64>)> {
    let (gamma, reduced) = reduce_to_std_domain(z)?;
    group
        .coset_reps()
        .iter()
        .map(|v| (*v * gamma, v))
        .find(|(candidate, _)| candidate.in_gamma0(group.level()))
        .map(|(candidate, v)| (candidate, v.act(reduced)))
        .ok_or_else(|| HejhalError::InconsistentGroupData {
            level: group.level(),
            reason: format!("no coset representative moves {gamma} into Γ0(N)"),
        })
}

/// The vertex a point is closest to, with the point expressed in that cusp's local coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearestCusp {
    pub vertex_index: usize,
    pub vertex: Cusp,
    pub cusp: Cusp,
    pub cusp_index: usize,
    /// Im(σ_v⁻¹·U_v·w)
    pub height: f64,
    /// σ_v⁻¹·U_v·w
    pub local: Complex<f64>,
}

/// Finds the parabolic vertex at which `w` sits highest.
///
/// Exact ties keep the vertex that comes first in [`GroupData::vertices`].
pub fn nearest_cusp(w: Complex<f64>, group: &GroupData) -> NearestCusp {
    let mut best: Option<NearestCusp> = None;
    for (vertex_index, data) in group.vertices().iter().enumerate() {
        let local = data.local(w);
        if best.map_or(true, |b| local.im > b.height) {
            best = Some(NearestCusp {
                vertex_index,
                vertex: data.vertex,
                cusp: data.cusp,
                cusp_index: data.cusp_index,
                height: local.im,
                local,
            });
        }
    }
    // The vertex list always contains ∞.
    best.unwrap_or(NearestCusp {
        vertex_index: 0,
        vertex: Cusp::Infinity,
        cusp: Cusp::Infinity,
        cusp_index: 0,
        height: w.im,
        local: w,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduction_lands_in_domain_and_is_idempotent() {
        let points = [
            Complex::new(0.3, 0.01),
            Complex::new(-2.7, 0.05),
            Complex::new(0.49, 0.3),
            Complex::new(10.2, 1e-3),
        ];
        for z in points {
            let (gamma, reduced) = reduce_to_std_domain(z).expect("reduction");
            assert!(in_std_domain(reduced), "{z} -> {reduced}");
            assert!((gamma.act(z) - reduced).norm() < 1e-9);

            let (again, twice) = reduce_to_std_domain(reduced).expect("reduction");
            assert_eq!(again, Sl2z::IDENTITY);
            assert_eq!(twice, reduced);
        }
    }

    #[test]
    fn reduction_rejects_points_off_the_upper_half_plane() {
        let err = reduce_to_std_domain(Complex::new(0.2, 0.0)).expect_err("real point");
        assert!(matches!(err, HejhalError::PullbackDivergence { .. }));
        assert!(reduce_to_std_domain(Complex::new(0.2, -1.0)).is_err());
    }

    #[test]
    fn subgroup_pullback_round_trips() {
        for level in [1, 2, 5, 6, 12, 30] {
            let group = GroupData::build(level).expect("valid level");
            for m in 1..=20 {
                let y = 0.98 * 3f64.sqrt() / (2.0 * level as f64);
                let z = Complex::new((m as f64 - 0.5) / 40.0, y);
                let (gamma, w) = reduce_to_subgroup_domain(z, &group).expect("pullback");
                assert!(gamma.in_gamma0(level));
                assert!((gamma.act(z) - w).norm() < 1e-6, "level {level}, z = {z}");
            }
        }
    }

    #[test]
    fn level_five_sample_is_closest_to_zero() {
        let group = GroupData::build(5).expect("valid level");
        let (gamma, w) =
            reduce_to_subgroup_domain(Complex::new(0.26, 0.045), &group).expect("pullback");
        assert_eq!(gamma, Sl2z::new(-4, 1, 15, -4));
        let nearest = nearest_cusp(w, &group);
        assert_eq!(nearest.vertex_index, 1);
        assert_eq!(nearest.vertex, Cusp::zero());
        assert_eq!(nearest.cusp, Cusp::zero());
        assert!((nearest.height - 0.264705882).abs() < 1e-7);
    }

    #[test]
    fn nearest_cusp_at_level_one_is_infinity() {
        let group = GroupData::build(1).expect("valid level");
        let w = Complex::new(0.1, 1.3);
        let nearest = nearest_cusp(w, &group);
        assert_eq!(nearest.cusp, Cusp::Infinity);
        assert_eq!(nearest.local, w);
    }
}
