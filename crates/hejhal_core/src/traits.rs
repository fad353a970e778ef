use num_traits::Float;
use std::fmt::Debug;
use twofloat::TwoFloat;

/// A trait for types that can be used as scalars in the dense linear solvers.
/// Must support basic arithmetic, debug printing, and lossless conversion from f64.
pub trait Scalar: Float + From<f64> + Into<f64> + Debug + 'static {
    /// Unit roundoff of the representation (half the gap between 1 and the next value).
    ///
    /// `Float::epsilon` is not usable for this generically: double-double types
    /// report the smallest normal number there.
    fn unit_roundoff() -> f64;
}

impl Scalar for f64 {
    fn unit_roundoff() -> f64 {
        f64::EPSILON / 2.0
    }
}

impl Scalar for TwoFloat {
    fn unit_roundoff() -> f64 {
        // 2^-104
        (-104.0f64).exp2()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundoff_is_visible<T: Scalar>() -> bool {
        let one: T = 1.0.into();
        let step: T = (4.0 * T::unit_roundoff()).into();
        one + step > one
    }

    #[test]
    fn roundoff_matches_precision() {
        assert!(roundoff_is_visible::<f64>());
        assert!(roundoff_is_visible::<TwoFloat>());
        assert!(TwoFloat::unit_roundoff() < f64::unit_roundoff() * 1e-15);
    }
}
