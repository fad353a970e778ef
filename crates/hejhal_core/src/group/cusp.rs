use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arith::gcd;

/// A point of P¹(Q): either ∞ or a reduced fraction with positive denominator.
///
/// The derived order places ∞ first and then sorts rationals by (numerator, denominator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Cusp {
    Infinity,
    Rational { num: i64, den: i64 },
}

impl Cusp {
    /// Builds the cusp num/den in lowest terms. A zero denominator gives ∞.
    pub fn new(num: i64, den: i64) -> Self {
        if den == 0 {
            return Cusp::Infinity;
        }
        let g = gcd(num, den);
        let sign = if den < 0 { -1 } else { 1 };
        Cusp::Rational {
            num: sign * num / g,
            den: sign * den / g,
        }
    }

    pub fn zero() -> Self {
        Cusp::Rational { num: 0, den: 1 }
    }

    pub fn is_infinity(&self) -> bool {
        matches!(self, Cusp::Infinity)
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Cusp::Rational { num: 0, .. })
    }

    /// (numerator, denominator) with ∞ represented as (1, 0).
    pub fn as_pair(&self) -> (i64, i64) {
        match *self {
            Cusp::Infinity => (1, 0),
            Cusp::Rational { num, den } => (num, den),
        }
    }
}

impl fmt::Display for Cusp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Cusp::Infinity => write!(f, "∞"),
            Cusp::Rational { num, den: 1 } => write!(f, "{num}"),
            Cusp::Rational { num, den } => write!(f, "{num}/{den}"),
        }
    }
}
