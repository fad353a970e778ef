use std::fmt;
use std::ops::Mul;

use num_complex::Complex;
use serde::{Deserialize, Serialize};

use super::cusp::Cusp;

/// An integer matrix (a b; c d) of determinant one, acting by Möbius transformations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sl2z {
    pub a: i64,
    pub b: i64,
    pub c: i64,
    pub d: i64,
}

impl Sl2z {
    pub const IDENTITY: Sl2z = Sl2z {
        a: 1,
        b: 0,
        c: 0,
        d: 1,
    };

    /// z ↦ -1/z
    pub const S: Sl2z = Sl2z {
        a: 0,
        b: -1,
        c: 1,
        d: 0,
    };

    pub fn new(a: i64, b: i64, c: i64, d: i64) -> Self {
        Self { a, b, c, d }
    }

    /// z ↦ z + n
    pub fn translation(n: i64) -> Self {
        Self::new(1, n, 0, 1)
    }

    pub fn det(&self) -> i64 {
        self.a * self.d - self.b * self.c
    }

    pub fn inverse(&self) -> Self {
        Self::new(self.d, -self.b, -self.c, self.a)
    }

    /// Membership in Γ0(N).
    pub fn in_gamma0(&self, level: u64) -> bool {
        self.c.rem_euclid(level as i64) == 0
    }

    pub fn act(&self, z: Complex<f64>) -> Complex<f64> {
        let num = z * self.a as f64 + self.b as f64;
        let den = z * self.c as f64 + self.d as f64;
        num / den
    }

    pub fn act_on_cusp(&self, cusp: &Cusp) -> Cusp {
        let (p, q) = cusp.as_pair();
        Cusp::new(self.a * p + self.b * q, self.c * p + self.d * q)
    }

    /// Image of ∞, i.e. the cusp a/c.
    pub fn vertex(&self) -> Cusp {
        Cusp::new(self.a, self.c)
    }
}

impl Mul for Sl2z {
    type Output = Sl2z;

    fn mul(self, rhs: Sl2z) -> Sl2z {
        Sl2z::new(
            self.a * rhs.a + self.b * rhs.c,
            self.a * rhs.b + self.b * rhs.d,
            self.c * rhs.a + self.d * rhs.c,
            self.c * rhs.b + self.d * rhs.d,
        )
    }
}

impl fmt::Display for Sl2z {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {}; {} {})", self.a, self.b, self.c, self.d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn products_keep_unit_determinant() {
        let m = Sl2z::S * Sl2z::translation(3) * Sl2z::new(2, 1, 5, 3);
        assert_eq!(m.det(), 1);
        assert_eq!(m * m.inverse(), Sl2z::IDENTITY);
    }

    #[test]
    fn action_is_compatible_with_products() {
        let g = Sl2z::new(2, 1, 5, 3);
        let h = Sl2z::S * Sl2z::translation(-2);
        let z = Complex::new(0.3, 0.7);
        let lhs = (g * h).act(z);
        let rhs = g.act(h.act(z));
        assert!((lhs - rhs).norm() < 1e-12);
        assert_eq!(Sl2z::S.act_on_cusp(&Cusp::Infinity), Cusp::zero());
        assert_eq!(g.vertex(), Cusp::new(2, 5));
    }
}
