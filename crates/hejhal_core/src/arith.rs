//! Small integer helpers used when building Γ0(N) data and sign assignments.

pub fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Returns (g, x, y) with a·x + b·y = g = gcd(a, b) and g ≥ 0.
pub fn extended_gcd(a: i64, b: i64) -> (i64, i64, i64) {
    let (mut old_r, mut r) = (a, b);
    let (mut old_x, mut x) = (1i64, 0i64);
    let (mut old_y, mut y) = (0i64, 1i64);
    while r != 0 {
        let q = old_r / r;
        (old_r, r) = (r, old_r - q * r);
        (old_x, x) = (x, old_x - q * x);
        (old_y, y) = (y, old_y - q * y);
    }
    if old_r < 0 {
        (-old_r, -old_x, -old_y)
    } else {
        (old_r, old_x, old_y)
    }
}

/// Prime factorization as (prime, exponent) pairs in increasing order.
pub fn factorize(mut n: u64) -> Vec<(u64, u32)> {
    let mut factors = Vec::new();
    let mut p = 2u64;
    while p * p <= n {
        if n % p == 0 {
            let mut exp = 0;
            while n % p == 0 {
                n /= p;
                exp += 1;
            }
            factors.push((p, exp));
        }
        p += 1;
    }
    if n > 1 {
        factors.push((n, 1));
    }
    factors
}

/// Positive divisors of `n` in increasing order.
pub fn divisors(n: u64) -> Vec<u64> {
    let mut small = Vec::new();
    let mut large = Vec::new();
    let mut d = 1u64;
    while d * d <= n {
        if n % d == 0 {
            small.push(d);
            if d * d != n {
                large.push(n / d);
            }
        }
        d += 1;
    }
    small.extend(large.into_iter().rev());
    small
}

/// Distinct odd primes dividing `n`, increasing.
pub fn odd_prime_divisors(n: u64) -> Vec<u64> {
    factorize(n)
        .into_iter()
        .map(|(p, _)| p)
        .filter(|&p| p != 2)
        .collect()
}

/// Index of Γ0(N) in SL2(Z): N·∏(1 + 1/p).
pub fn psi(n: u64) -> u64 {
    factorize(n)
        .into_iter()
        .fold(n, |acc, (p, _)| acc / p * (p + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_gcd_produces_bezout_coefficients() {
        for (a, b) in [(240, 46), (-7, 3), (5, 0), (0, 9), (12, 18)] {
            let (g, x, y) = extended_gcd(a, b);
            assert_eq!(g, gcd(a, b));
            assert_eq!(a * x + b * y, g);
        }
    }

    #[test]
    fn divisors_and_index() {
        assert_eq!(divisors(30), vec![1, 2, 3, 5, 6, 10, 15, 30]);
        assert_eq!(divisors(1), vec![1]);
        assert_eq!(odd_prime_divisors(120), vec![3, 5]);
        assert_eq!(psi(1), 1);
        assert_eq!(psi(8), 12);
        assert_eq!(psi(30), 72);
    }
}
