//! Polynomial-ring transform engine: number-theoretic transforms over
//! power-of-two and arbitrary cyclotomic orders, per-modulus twiddle caches,
//! and the format-tagged ring-element and double-CRT tower representations
//! built on top of them.

pub mod dft;
pub mod error;
pub mod modulus;
pub mod nbtheory;
pub mod poly;
pub mod ring;
pub mod tower;

/// Clears every process-wide transform cache for both scalar types.
/// Tables are rebuilt lazily on next use.
pub fn reset_caches() {
    use crate::modulus::ModOps;
    <u64 as ModOps>::ftt_tables().reset();
    <u64 as ModOps>::arb_tables().reset();
    <num_bigint::BigUint as ModOps>::ftt_tables().reset();
    <num_bigint::BigUint as ModOps>::arb_tables().reset();
}
