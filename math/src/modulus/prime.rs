use primality_test::is_prime;

use crate::error::MathError;

/// Streams native-word primes congruent to 1 mod nth_root around a target
/// bit size, walking upward and downward from 2^bit_size + 1.
///
/// Such primes admit an nth_root-th root of unity, which is what the tower
/// moduli of a double-CRT representation need.
pub struct NttFriendlyPrimeGenerator {
    size: f64,
    next_prime: u64,
    prev_prime: u64,
    nth_root: u64,
    check_next_prime: bool,
    check_prev_prime: bool,
}

impl NttFriendlyPrimeGenerator {
    pub fn new(bit_size: u64, nth_root: u64) -> Self {
        assert!(
            nth_root.is_power_of_two(),
            "invalid nth_root = {}: not a power of two",
            nth_root
        );
        assert!(bit_size < 62, "invalid bit_size = {}: exceeds 61", bit_size);

        let mut check_next_prime: bool = true;
        let mut check_prev_prime: bool = true;
        let next_prime: u64 = (1u64 << bit_size) + 1;
        let mut prev_prime: u64 = next_prime;

        if next_prime > nth_root.wrapping_neg() {
            check_next_prime = false;
        }

        if prev_prime < nth_root {
            check_prev_prime = false;
        } else {
            prev_prime -= nth_root;
        }

        Self {
            size: bit_size as f64,
            next_prime,
            prev_prime,
            nth_root,
            check_next_prime,
            check_prev_prime,
        }
    }

    /// Returns the next k primes above 2^bit_size.
    pub fn next_upstream_primes(&mut self, k: usize) -> Result<Vec<u64>, MathError> {
        (0..k).map(|_| self.next_upstream_prime()).collect()
    }

    /// Returns the next k primes below 2^bit_size.
    pub fn next_downstream_primes(&mut self, k: usize) -> Result<Vec<u64>, MathError> {
        (0..k).map(|_| self.next_downstream_prime()).collect()
    }

    /// Returns the next k primes, alternating above and below 2^bit_size.
    pub fn next_alternating_primes(&mut self, k: usize) -> Result<Vec<u64>, MathError> {
        (0..k).map(|_| self.next_alternating_prime()).collect()
    }

    pub fn next_upstream_prime(&mut self) -> Result<u64, MathError> {
        loop {
            if !self.check_next_prime {
                return Err(MathError::PrimeSearchExhausted(
                    "upstream primes overlap the next bit size or exceed the word",
                ));
            }
            if (self.next_prime as f64).log2() - self.size >= 0.5
                || self.next_prime > u64::MAX - self.nth_root
            {
                self.check_next_prime = false;
                continue;
            }
            let candidate: u64 = self.next_prime;
            self.next_prime += self.nth_root;
            if is_prime(candidate) {
                return Ok(candidate);
            }
        }
    }

    pub fn next_downstream_prime(&mut self) -> Result<u64, MathError> {
        loop {
            if !self.check_prev_prime {
                return Err(MathError::PrimeSearchExhausted(
                    "downstream primes overlap the previous bit size or fall below nth_root",
                ));
            }
            if self.size - (self.prev_prime as f64).log2() >= 0.5 || self.prev_prime < self.nth_root
            {
                self.check_prev_prime = false;
                continue;
            }
            let candidate: u64 = self.prev_prime;
            self.prev_prime -= self.nth_root;
            if is_prime(candidate) {
                return Ok(candidate);
            }
        }
    }

    pub fn next_alternating_prime(&mut self) -> Result<u64, MathError> {
        loop {
            if !(self.check_next_prime || self.check_prev_prime) {
                return Err(MathError::PrimeSearchExhausted(
                    "both upstream and downstream prime ranges are exhausted",
                ));
            }

            if self.check_next_prime {
                match self.next_upstream_prime() {
                    Ok(prime) => return Ok(prime),
                    Err(_) => {}
                }
            }

            if self.check_prev_prime {
                match self.next_downstream_prime() {
                    Ok(prime) => return Ok(prime),
                    Err(_) => {}
                }
            }
        }
    }
}
