use num_bigint::BigUint;
use num_traits::cast::ToPrimitive;
use num_traits::One;

/// Barrett constant for a native-word modulus: the two limbs of
/// floor(2^128 / q). Reduces a full 128-bit product without division.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BarrettPrecomp {
    q: u64,
    lo: u64,
    hi: u64,
}

impl BarrettPrecomp {
    pub fn new(q: u64) -> BarrettPrecomp {
        assert!(q > 1, "invalid modulus: q = {}", q);
        assert!(
            q < 1u64 << 62,
            "invalid modulus: q = {} exceeds 62 bits",
            q
        );
        let big_r: BigUint = (BigUint::one() << ((u64::BITS << 1) as usize)) / BigUint::from(q);
        let lo: u64 = (&big_r & BigUint::from(u64::MAX)).to_u64().unwrap();
        let hi: u64 = (big_r >> u64::BITS).to_u64().unwrap();
        Self { q, lo, hi }
    }

    #[inline(always)]
    pub fn q(&self) -> u64 {
        self.q
    }

    /// Returns x mod q for any 128-bit x.
    ///
    /// The quotient estimate floor(x * floor(2^128/q) / 2^128) computed from
    /// the split limbs undershoots the true quotient by at most a few units;
    /// the remainder is fixed up by conditional subtractions.
    #[inline(always)]
    pub fn reduce_u128(&self, x: u128) -> u64 {
        let x_lo: u64 = x as u64;
        let x_hi: u64 = (x >> 64) as u64;
        let q_hat: u128 = (x_hi as u128) * (self.hi as u128)
            + (((x_hi as u128) * (self.lo as u128)) >> 64)
            + (((x_lo as u128) * (self.hi as u128)) >> 64);
        let mut r: u64 = (x.wrapping_sub(q_hat.wrapping_mul(self.q as u128))) as u64;
        while r >= self.q {
            r -= self.q;
        }
        r
    }

    /// Returns a * b mod q.
    #[inline(always)]
    pub fn mul(&self, a: u64, b: u64) -> u64 {
        self.reduce_u128((a as u128) * (b as u128))
    }
}

/// Barrett constant for a multiprecision modulus:
/// mu = floor(2^(2k+3) / q) with k the bit length of q.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BigBarrett {
    q: BigUint,
    mu: BigUint,
    shift: u64,
}

impl BigBarrett {
    pub fn new(q: &BigUint) -> BigBarrett {
        assert!(q > &BigUint::one(), "invalid modulus: q = {}", q);
        let shift: u64 = 2 * q.bits() + 3;
        let mu: BigUint = (BigUint::one() << shift) / q;
        Self {
            q: q.clone(),
            mu,
            shift,
        }
    }

    pub fn q(&self) -> &BigUint {
        &self.q
    }

    /// Returns x mod q for x < q^2 * 8.
    pub fn reduce(&self, x: BigUint) -> BigUint {
        let q_hat: BigUint = (&x * &self.mu) >> self.shift;
        let mut r: BigUint = x - q_hat * &self.q;
        while r >= self.q {
            r -= &self.q;
        }
        r
    }

    /// Returns a * b mod q.
    pub fn mul(&self, a: &BigUint, b: &BigUint) -> BigUint {
        self.reduce(a * b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_u128() {
        let q: u64 = 0x800000000004001u64;
        let red: BarrettPrecomp = BarrettPrecomp::new(q);
        let a: u64 = q - 1;
        let b: u64 = q - 2;
        assert_eq!(
            red.mul(a, b),
            ((a as u128 * b as u128) % q as u128) as u64
        );
        assert_eq!(red.reduce_u128(0), 0);
        assert_eq!(red.reduce_u128(q as u128), 0);
        assert_eq!(red.reduce_u128((q as u128) * 7 + 5), 5);
    }

    #[test]
    fn test_big_reduce() {
        let q: BigUint = BigUint::from(0x800000000004001u64);
        let red: BigBarrett = BigBarrett::new(&q);
        let a: BigUint = &q - 1u32;
        let b: BigUint = &q - 2u32;
        assert_eq!(red.mul(&a, &b), (&a * &b) % &q);
        assert_eq!(red.reduce((&q) * 5u32 + 3u32), BigUint::from(3u32));
    }
}
