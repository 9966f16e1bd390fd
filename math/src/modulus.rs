pub mod barrett;
pub mod prime;

use std::hash::Hash;

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use sampling::source::Source;

use crate::dft::arb::ArbTables;
use crate::dft::ftt::FttTables;
use crate::error::MathError;
use crate::modulus::barrett::{BarrettPrecomp, BigBarrett};

pub trait WordOps<O> {
    fn log2(self) -> usize;
    fn reverse_bits_msb(self, n: u32) -> O;
    fn mask(self) -> O;
}

impl WordOps<u64> for u64 {
    #[inline(always)]
    fn log2(self) -> usize {
        (u64::BITS - (self - 1).leading_zeros()) as _
    }
    #[inline(always)]
    fn reverse_bits_msb(self, n: u32) -> u64 {
        self.reverse_bits() >> (u64::BITS - n)
    }
    #[inline(always)]
    fn mask(self) -> u64 {
        (1 << self.log2()) - 1
    }
}

impl WordOps<usize> for usize {
    #[inline(always)]
    fn log2(self) -> usize {
        (usize::BITS - (self - 1).leading_zeros()) as _
    }
    #[inline(always)]
    fn reverse_bits_msb(self, n: u32) -> usize {
        self.reverse_bits() >> (usize::BITS - n)
    }
    #[inline(always)]
    fn mask(self) -> usize {
        (1 << self.log2()) - 1
    }
}

/// Scalar interface the transform engine is generic over.
///
/// Implemented for u64 (native tower moduli, reduction through a two-limb
/// floor(2^128/q) Barrett constant) and BigUint (big-modulus elements,
/// reduction through the mu = floor(2^(2k+3)/q) Barrett constant).
///
/// Operands of the modular operations must be reduced, i.e. in [0, q);
/// outputs are reduced.
pub trait ModOps:
    Sized
    + Clone
    + PartialEq
    + Eq
    + Hash
    + PartialOrd
    + Ord
    + Default
    + Zero
    + One
    + std::fmt::Debug
    + std::fmt::Display
    + Send
    + Sync
    + 'static
{
    type Reducer: Clone + std::fmt::Debug + Send + Sync;

    fn from_u64(v: u64) -> Self;
    fn to_biguint(&self) -> BigUint;
    fn from_biguint(v: &BigUint) -> Option<Self>;

    /// Number of significant bits of the value (0 for the value 0).
    fn bits(&self) -> u64;

    /// Returns the per-modulus reduction constant consumed by mul_mod.
    fn reducer(q: &Self) -> Self::Reducer;

    fn add_mod(&self, rhs: &Self, q: &Self) -> Self;
    fn sub_mod(&self, rhs: &Self, q: &Self) -> Self;
    fn neg_mod(&self, q: &Self) -> Self;
    fn mul_mod(&self, rhs: &Self, red: &Self::Reducer) -> Self;
    fn pow_mod(&self, exponent: &Self, q: &Self) -> Self;
    fn inv_mod(&self, q: &Self) -> Result<Self, MathError>;

    /// Plain reduction of an arbitrary (not necessarily in-range) value.
    fn reduce(&self, q: &Self) -> Self;

    /// Uniform value in [0, q) by rejection sampling.
    fn sample_uniform(q: &Self, source: &mut Source) -> Self;

    /// Process-wide power-of-two transform tables for this scalar type.
    fn ftt_tables() -> &'static FttTables<Self>;

    /// Process-wide arbitrary-order transform tables for this scalar type.
    fn arb_tables() -> &'static ArbTables<Self>;
}

impl ModOps for u64 {
    type Reducer = BarrettPrecomp;

    #[inline(always)]
    fn from_u64(v: u64) -> Self {
        v
    }

    fn to_biguint(&self) -> BigUint {
        BigUint::from(*self)
    }

    fn from_biguint(v: &BigUint) -> Option<Self> {
        ToPrimitive::to_u64(v)
    }

    #[inline(always)]
    fn bits(&self) -> u64 {
        (u64::BITS - self.leading_zeros()) as u64
    }

    fn reducer(q: &Self) -> BarrettPrecomp {
        BarrettPrecomp::new(*q)
    }

    #[inline(always)]
    fn add_mod(&self, rhs: &Self, q: &Self) -> Self {
        debug_assert!(*self < *q && *rhs < *q, "operands not reduced mod {}", q);
        let r: u64 = self + rhs;
        if r >= *q {
            r - q
        } else {
            r
        }
    }

    #[inline(always)]
    fn sub_mod(&self, rhs: &Self, q: &Self) -> Self {
        debug_assert!(*self < *q && *rhs < *q, "operands not reduced mod {}", q);
        if self >= rhs {
            self - rhs
        } else {
            self + q - rhs
        }
    }

    #[inline(always)]
    fn neg_mod(&self, q: &Self) -> Self {
        if *self == 0 {
            0
        } else {
            q - self
        }
    }

    #[inline(always)]
    fn mul_mod(&self, rhs: &Self, red: &BarrettPrecomp) -> Self {
        red.reduce_u128((*self as u128) * (*rhs as u128))
    }

    fn pow_mod(&self, exponent: &Self, q: &Self) -> Self {
        let red: BarrettPrecomp = BarrettPrecomp::new(*q);
        let mut y: u64 = 1;
        let mut x: u64 = *self % *q;
        let mut i: u64 = *exponent;
        while i > 0 {
            if i & 1 == 1 {
                y = y.mul_mod(&x, &red);
            }
            x = x.mul_mod(&x, &red);
            i >>= 1;
        }
        y
    }

    fn inv_mod(&self, q: &Self) -> Result<Self, MathError> {
        let (mut old_r, mut r) = (*self as i128, *q as i128);
        let (mut old_s, mut s) = (1i128, 0i128);
        while r != 0 {
            let quotient: i128 = old_r / r;
            (old_r, r) = (r, old_r - quotient * r);
            (old_s, s) = (s, old_s - quotient * s);
        }
        if old_r != 1 {
            return Err(MathError::InverseNotExists(
                self.to_string(),
                q.to_string(),
            ));
        }
        Ok(old_s.rem_euclid(*q as i128) as u64)
    }

    #[inline(always)]
    fn reduce(&self, q: &Self) -> Self {
        self % q
    }

    fn sample_uniform(q: &Self, source: &mut Source) -> Self {
        source.next_u64n(*q, q.mask())
    }

    fn ftt_tables() -> &'static FttTables<Self> {
        crate::dft::ftt::shared_u64()
    }

    fn arb_tables() -> &'static ArbTables<Self> {
        crate::dft::arb::shared_u64()
    }
}

impl ModOps for BigUint {
    type Reducer = BigBarrett;

    fn from_u64(v: u64) -> Self {
        BigUint::from(v)
    }

    fn to_biguint(&self) -> BigUint {
        self.clone()
    }

    fn from_biguint(v: &BigUint) -> Option<Self> {
        Some(v.clone())
    }

    fn bits(&self) -> u64 {
        BigUint::bits(self)
    }

    fn reducer(q: &Self) -> BigBarrett {
        BigBarrett::new(q)
    }

    fn add_mod(&self, rhs: &Self, q: &Self) -> Self {
        debug_assert!(self < q && rhs < q, "operands not reduced mod {}", q);
        let r: BigUint = self + rhs;
        if &r >= q {
            r - q
        } else {
            r
        }
    }

    fn sub_mod(&self, rhs: &Self, q: &Self) -> Self {
        debug_assert!(self < q && rhs < q, "operands not reduced mod {}", q);
        if self >= rhs {
            self - rhs
        } else {
            self + q - rhs
        }
    }

    fn neg_mod(&self, q: &Self) -> Self {
        if Zero::is_zero(self) {
            BigUint::zero()
        } else {
            q - self
        }
    }

    fn mul_mod(&self, rhs: &Self, red: &BigBarrett) -> Self {
        red.reduce(self * rhs)
    }

    fn pow_mod(&self, exponent: &Self, q: &Self) -> Self {
        self.modpow(exponent, q)
    }

    fn inv_mod(&self, q: &Self) -> Result<Self, MathError> {
        self.modinv(q)
            .ok_or_else(|| MathError::InverseNotExists(self.to_string(), q.to_string()))
    }

    fn reduce(&self, q: &Self) -> Self {
        self % q
    }

    fn sample_uniform(q: &Self, source: &mut Source) -> Self {
        use rand_core::RngCore;
        let bits: u64 = q.bits();
        let bytes: usize = ((bits + 7) / 8) as usize;
        let top_mask: u8 = if bits % 8 == 0 {
            0xff
        } else {
            (1u8 << (bits % 8)) - 1
        };
        let mut buf: Vec<u8> = vec![0u8; bytes];
        loop {
            source.fill_bytes(&mut buf);
            buf[bytes - 1] &= top_mask;
            let candidate: BigUint = BigUint::from_bytes_le(&buf);
            if &candidate < q {
                return candidate;
            }
        }
    }

    fn ftt_tables() -> &'static FttTables<Self> {
        crate::dft::ftt::shared_big()
    }

    fn arb_tables() -> &'static ArbTables<Self> {
        crate::dft::arb::shared_big()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::One;

    #[test]
    fn test_u64_mod_ops() {
        let q: u64 = 0x1fffffffffe00001u64;
        let red = <u64 as ModOps>::reducer(&q);
        let a: u64 = q - 5;
        let b: u64 = q - 7;
        assert_eq!(a.add_mod(&b, &q), q - 12);
        assert_eq!(a.sub_mod(&b, &q), 2);
        assert_eq!(b.sub_mod(&a, &q), q - 2);
        let expected: u64 = ((a as u128 * b as u128) % q as u128) as u64;
        assert_eq!(a.mul_mod(&b, &red), expected);
        let inv: u64 = a.inv_mod(&q).unwrap();
        assert_eq!(a.mul_mod(&inv, &red), 1);
        assert_eq!(a.pow_mod(&(q - 1), &q), 1);
    }

    #[test]
    fn test_big_mod_ops() {
        let q: BigUint = BigUint::from(0x1fffffffffe00001u64);
        let red = <BigUint as ModOps>::reducer(&q);
        let a: BigUint = &q - 11u32;
        let b: BigUint = &q - 13u32;
        assert_eq!(a.add_mod(&b, &q), &q - 24u32);
        assert_eq!(a.mul_mod(&b, &red), (&a * &b) % &q);
        let inv: BigUint = a.inv_mod(&q).unwrap();
        assert!(One::is_one(&a.mul_mod(&inv, &red)));
    }

    #[test]
    fn test_uniform_sampling_in_range() {
        let mut source = Source::new([7u8; 32]);
        let q: BigUint = BigUint::from(0x1fffffffffe00001u64);
        for _ in 0..100 {
            assert!(BigUint::sample_uniform(&q, &mut source) < q);
        }
    }
}
