//! Hecke relations satisfied by the coefficients of a newform.
//!
//! Defects measure how far a coefficient vector is from multiplicativity and
//! are used as a cheap independent check on a located eigenvalue.

use crate::arith::gcd;
use crate::solvers::FourierCoefficients;

const MULTIPLICATIVE_PAIRS: [(usize, usize); 3] = [(2, 3), (2, 5), (3, 5)];
const SQUARED_PRIMES: [usize; 2] = [2, 3];

/// a(m)·a(n) − a(mn) for coprime m, n.
pub fn multiplicative_defect(coeffs: &FourierCoefficients, m: usize, n: usize) -> Option<f64> {
    if gcd(m as i64, n as i64) != 1 {
        return None;
    }
    Some(coeffs.a(m)? * coeffs.a(n)? - coeffs.a(m * n)?)
}

/// a(p)² − χ₀(p) − a(p²), with χ₀ the trivial character modulo `level`.
pub fn prime_square_defect(coeffs: &FourierCoefficients, p: usize, level: u64) -> Option<f64> {
    let chi = if level % p as u64 == 0 { 0.0 } else { 1.0 };
    let ap = coeffs.a(p)?;
    Some(ap * ap - chi - coeffs.a(p * p)?)
}

/// Largest absolute defect over the standard relations present in `coeffs`.
///
/// Returns `None` when the vector is too short for any of them.
pub fn hecke_cost(coeffs: &FourierCoefficients, level: u64) -> Option<f64> {
    MULTIPLICATIVE_PAIRS
        .iter()
        .filter_map(|&(m, n)| multiplicative_defect(coeffs, m, n))
        .chain(
            SQUARED_PRIMES
                .iter()
                .filter_map(|&p| prime_square_defect(coeffs, p, level)),
        )
        .map(f64::abs)
        .reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bessel::BesselEvaluator;
    use crate::group::GroupData;
    use crate::horocycle::MaassSpace;
    use crate::signs::SignAssignment;
    use crate::solvers::solve;
    use crate::system::Symmetry;
    use crate::truncation::truncation;

    #[test]
    fn multiplicative_sequences_have_no_defect() {
        // a(n) = n^(-1/2) is completely multiplicative.
        let coeffs = FourierCoefficients::from_unknowns((2..30).map(|n| (n as f64).powf(-0.5)));
        assert!(multiplicative_defect(&coeffs, 2, 3).expect("present").abs() < 1e-15);
        assert_eq!(multiplicative_defect(&coeffs, 2, 4), None);
        assert_eq!(multiplicative_defect(&coeffs, 5, 7), None);
        // Completely multiplicative means a(p)² = a(p²), off by χ₀(p).
        assert!((prime_square_defect(&coeffs, 3, 1).expect("present") + 1.0).abs() < 1e-15);
        assert!(prime_square_defect(&coeffs, 3, 15).expect("present").abs() < 1e-15);
    }

    #[test]
    fn short_vectors_have_no_cost() {
        let coeffs = FourierCoefficients::from_unknowns([0.1, 0.2]);
        assert_eq!(hecke_cost(&coeffs, 1), None);
    }

    #[test]
    fn level_one_form_satisfies_hecke_relations() {
        let r = 9.53369526135;
        let y = 0.25;
        let q = truncation(r, y, 1e-16).expect("truncation") + 5;
        let group = GroupData::build(1).expect("valid level");
        let space = MaassSpace::with_size(group, r, y, q).expect("space");
        let mut bessel = BesselEvaluator::new();
        let coeffs = solve(
            y,
            r,
            &space,
            &SignAssignment::trivial(),
            Symmetry::Odd,
            &mut bessel,
        )
        .expect("solvable");

        assert!(multiplicative_defect(&coeffs, 2, 3).expect("present").abs() < 1e-8);
        assert!(multiplicative_defect(&coeffs, 2, 5).expect("present").abs() < 1e-7);
        assert!(multiplicative_defect(&coeffs, 3, 5).expect("present").abs() < 1e-5);
        assert!(hecke_cost(&coeffs, 1).expect("relations available") < 1e-3);
    }
}
