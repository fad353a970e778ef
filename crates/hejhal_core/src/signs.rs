//! Atkin–Lehner sign assignments over the cusps of Γ0(N).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::arith::{divisors, odd_prime_divisors};
use crate::error::{HejhalError, Result};
use crate::group::Cusp;

/// Sign ±1 attached to each cusp. ∞ always carries +1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignAssignment(BTreeMap<Cusp, i8>);

impl SignAssignment {
    /// The assignment {∞: +1}, the only one at level 1.
    pub fn trivial() -> Self {
        Self(BTreeMap::from([(Cusp::Infinity, 1)]))
    }

    /// Collects explicit signs; any value for ∞ is replaced by +1.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Cusp, i8)>) -> Self {
        let mut signs = Self::trivial();
        for (cusp, sign) in pairs {
            if !cusp.is_infinity() {
                signs.0.insert(cusp, if sign < 0 { -1 } else { 1 });
            }
        }
        signs
    }

    pub fn sign(&self, cusp: &Cusp) -> Option<i8> {
        self.0.get(cusp).copied()
    }

    /// Like [`SignAssignment::sign`], failing for cusps without a sign.
    pub fn require(&self, cusp: &Cusp) -> Result<i8> {
        self.sign(cusp).ok_or_else(|| HejhalError::UnsignedCusp {
            cusp: cusp.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Cusp, &i8)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Every ±1 choice on the non-∞ cusps, in binary counting order with + before −.
pub fn all_signs(cusps: &[Cusp]) -> Vec<SignAssignment> {
    let free: Vec<Cusp> = cusps.iter().filter(|c| !c.is_infinity()).copied().collect();
    (0u64..1 << free.len())
        .map(|mask| {
            SignAssignment::from_pairs(free.iter().enumerate().map(|(bit, cusp)| {
                let sign = if mask >> bit & 1 == 1 { -1 } else { 1 };
                (*cusp, sign)
            }))
        })
        .collect()
}

/// Multiplicative assignments generated by signs at the odd primes of `level`.
///
/// The smallest odd prime is pinned to +1 and the remaining ones run through all
/// choices, giving 2^(k-1) assignments for k odd primes (one when k = 0). A divisor
/// d > 1 gets the product of the signs of its odd primes and labels cusp 1/d, or
/// cusp 0 when d = N.
pub fn short_all_signs(level: u64) -> Vec<SignAssignment> {
    let primes = odd_prime_divisors(level);
    let free = primes.len().saturating_sub(1);
    let labelled: Vec<u64> = divisors(level).into_iter().filter(|&d| d > 1).collect();

    (0u64..1 << free)
        .map(|mask| {
            let prime_sign = |p: u64| -> i8 {
                match primes.iter().position(|&q| q == p) {
                    Some(i) if i > 0 && mask >> (i - 1) & 1 == 1 => -1,
                    _ => 1,
                }
            };
            SignAssignment::from_pairs(labelled.iter().map(|&d| {
                let sign = primes
                    .iter()
                    .filter(|&&p| d % p == 0)
                    .map(|&p| prime_sign(p))
                    .product::<i8>();
                let cusp = if d == level {
                    Cusp::zero()
                } else {
                    Cusp::new(1, d as i64)
                };
                (cusp, sign)
            }))
        })
        .collect()
}
