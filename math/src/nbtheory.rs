use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};
use prime_factorization::Factorization;
use primality_test::is_prime;
use sampling::source::{new_seed, Source};

use crate::error::MathError;
use crate::modulus::ModOps;

/// Rounds of the Miller-Rabin test for multiprecision candidates.
const MILLER_RABIN_ROUNDS: usize = 40;

/// Attempts before declaring a root-of-unity search degenerate.
const DEGENERATE_ROOT_RETRIES: usize = 100;

/// Step bound for the deterministic prime walk of first_prime.
const FIRST_PRIME_MAX_STEPS: usize = 1 << 20;

pub fn is_power_of_two(x: usize) -> bool {
    x != 0 && x & (x - 1) == 0
}

/// Miller-Rabin primality test; native-word candidates go through the
/// deterministic test of the primality-test crate, larger ones through
/// MILLER_RABIN_ROUNDS random witnesses.
pub fn miller_rabin(p: &BigUint, source: &mut Source) -> bool {
    if let Some(v) = p.to_u64() {
        return v > 1 && is_prime(v);
    }

    let one: BigUint = BigUint::one();
    let two: BigUint = BigUint::from(2u32);
    if p.is_even() {
        return false;
    }

    let p_minus_one: BigUint = p - &one;
    let mut d: BigUint = p_minus_one.clone();
    let mut s: usize = 0;
    while d.is_even() {
        d >>= 1;
        s += 1;
    }

    let sample_bound: BigUint = p - BigUint::from(3u32);
    'witness: for _ in 0..MILLER_RABIN_ROUNDS {
        let a: BigUint = BigUint::sample_uniform(&sample_bound, source) + &two;
        let mut x: BigUint = a.modpow(&d, p);
        if x == one || x == p_minus_one {
            continue;
        }
        for _ in 0..s - 1 {
            x = x.modpow(&two, p);
            if x == p_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Pollard-Rho cycle search; returns a non-trivial factor of the composite n.
pub fn pollard_rho(n: &BigUint, source: &mut Source) -> BigUint {
    let one: BigUint = BigUint::one();
    let two: BigUint = BigUint::from(2u32);

    if n.is_even() {
        return two;
    }

    loop {
        let c: BigUint = BigUint::sample_uniform(n, source);
        let mut x: BigUint = BigUint::sample_uniform(n, source);
        let mut y: BigUint = x.clone();

        loop {
            x = (&x * &x + &c) % n;
            y = (&y * &y + &c) % n;
            y = (&y * &y + &c) % n;
            let diff: BigUint = if x > y { &x - &y } else { &y - &x };
            if diff.is_zero() {
                // cycle closed without a factor, restart with a new offset
                break;
            }
            let divisor: BigUint = diff.gcd(n);
            if divisor == *n {
                break;
            }
            if divisor > one {
                return divisor;
            }
        }
    }
}

/// Distinct prime factors of n, via the prime_factorization crate for
/// native words and a Pollard-Rho worklist beyond that (iterative, so big
/// inputs cannot blow the stack).
pub fn prime_factorize(n: &BigUint, source: &mut Source) -> Vec<BigUint> {
    let mut factors: Vec<BigUint> = Vec::new();

    if let Some(v) = n.to_u64() {
        if v > 1 {
            for factor in Factorization::run(v).prime_factor_repr().iter() {
                factors.push(BigUint::from(factor.0));
            }
        }
        return factors;
    }

    let mut worklist: Vec<BigUint> = vec![n.clone()];
    while let Some(value) = worklist.pop() {
        if value.is_one() {
            continue;
        }
        if let Some(v) = value.to_u64() {
            for factor in Factorization::run(v).prime_factor_repr().iter() {
                let f: BigUint = BigUint::from(factor.0);
                if !factors.contains(&f) {
                    factors.push(f);
                }
            }
            continue;
        }
        if miller_rabin(&value, source) {
            if !factors.contains(&value) {
                factors.push(value);
            }
            continue;
        }
        let divisor: BigUint = pollard_rho(&value, source);
        let cofactor: BigUint = &value / &divisor;
        worklist.push(divisor);
        worklist.push(cofactor);
    }
    factors.sort();
    factors
}

/// Finds a generator of the multiplicative group mod the prime q by random
/// sampling, rejecting candidates that are p-th powers for some prime
/// p | q-1.
pub fn find_generator(q: &BigUint, source: &mut Source) -> BigUint {
    let one: BigUint = BigUint::one();
    let q_minus_one: BigUint = q - &one;
    let prime_factors: Vec<BigUint> = prime_factorize(&q_minus_one, source);

    loop {
        let candidate: BigUint = BigUint::sample_uniform(&q_minus_one, source) + &one;
        let mut passes: bool = true;
        for p in prime_factors.iter() {
            let exponent: BigUint = &q_minus_one / p;
            if candidate.modpow(&exponent, q).is_one() {
                passes = false;
                break;
            }
        }
        if passes {
            return candidate;
        }
    }
}

/// Returns a root of unity of the given order mod the prime modulus, i.e.
/// an r with r^order = 1 and r^(order/p) != 1 for every prime p | order.
///
/// Errors when order does not divide modulus-1 (a parameter-generation
/// mistake upstream), or when the search keeps degenerating to 1 past the
/// retry cap (which for a correct generator cannot happen unless order
/// is 1).
pub fn root_of_unity<O: ModOps>(order: usize, modulus: &O) -> Result<O, MathError> {
    let q: BigUint = modulus.to_biguint();
    let one: BigUint = BigUint::one();
    let q_minus_one: BigUint = &q - &one;
    let order_big: BigUint = BigUint::from(order);

    if !(&q_minus_one % &order_big).is_zero() {
        return Err(MathError::NoRootOfUnity {
            order,
            modulus: modulus.to_string(),
        });
    }

    let mut source: Source = Source::new(new_seed());
    let exponent: BigUint = &q_minus_one / &order_big;

    for _ in 0..DEGENERATE_ROOT_RETRIES {
        let generator: BigUint = find_generator(&q, &mut source);
        let root: BigUint = generator.modpow(&exponent, &q);
        if !root.is_one() {
            return Ok(O::from_biguint(&root).expect("root is below the modulus"));
        }
    }

    Err(MathError::DegenerateRootOfUnity {
        order,
        retries: DEGENERATE_ROOT_RETRIES,
    })
}

/// Checks r^order = 1 and r^(order/p) != 1 for every prime p | order.
pub fn is_primitive_root_of_unity<O: ModOps>(root: &O, order: usize, modulus: &O) -> bool {
    let q: BigUint = modulus.to_biguint();
    let r: BigUint = root.to_biguint();
    if r.is_zero() || !r.modpow(&BigUint::from(order), &q).is_one() {
        return false;
    }
    for factor in Factorization::run(order as u64).prime_factor_repr().iter() {
        let sub_order: u64 = order as u64 / factor.0;
        if r.modpow(&BigUint::from(sub_order), &q).is_one() {
            return false;
        }
    }
    true
}

/// Smallest prime q > 2^bits with q = 1 mod order.
pub fn first_prime(bits: u64, order: u64) -> Result<BigUint, MathError> {
    let order_big: BigUint = BigUint::from(order);
    let start: BigUint = BigUint::one() << bits;
    let rem: BigUint = &start % &order_big;
    let mut q: BigUint = if rem.is_zero() {
        &start + BigUint::one()
    } else {
        &start - &rem + &order_big + BigUint::one()
    };

    let mut source: Source = Source::new(new_seed());
    for _ in 0..FIRST_PRIME_MAX_STEPS {
        if miller_rabin(&q, &mut source) {
            return Ok(q);
        }
        q += &order_big;
    }
    Err(MathError::PrimeSearchExhausted(
        "no prime = 1 mod order found above 2^bits within the step bound",
    ))
}

/// Euler totient of m.
pub fn totient(m: usize) -> usize {
    if m == 1 {
        return 1;
    }
    let mut phi: usize = m;
    for factor in Factorization::run(m as u64).prime_factor_repr().iter() {
        let p: usize = factor.0 as usize;
        phi = phi / p * (p - 1);
    }
    phi
}

/// The integers in [1, m) coprime to m, in increasing order. These index the
/// primitive m-th roots of unity among all m-th roots.
pub fn totient_list(m: usize) -> Vec<usize> {
    (1..m).filter(|k| k.gcd(&m) == 1).collect()
}

/// Coefficients of the m-th cyclotomic polynomial reduced mod the modulus,
/// ascending degree, length totient(m)+1.
///
/// Computed exactly over the integers by dividing x^d - 1 by the proper
/// divisor cyclotomics, for each divisor d of m in ascending order.
pub fn cyclotomic_polynomial<O: ModOps>(m: usize, modulus: &O) -> Vec<O> {
    let divisors: Vec<usize> = (1..=m).filter(|d| m % d == 0).collect();
    let mut cyclotomics: Vec<(usize, Vec<BigInt>)> = Vec::with_capacity(divisors.len());

    for &d in divisors.iter() {
        // x^d - 1
        let mut numerator: Vec<BigInt> = vec![BigInt::zero(); d + 1];
        numerator[0] = BigInt::from(-1);
        numerator[d] = BigInt::one();

        for (e, phi_e) in cyclotomics.iter() {
            if d % e == 0 {
                numerator = poly_div_exact(&numerator, phi_e);
            }
        }
        cyclotomics.push((d, numerator));
    }

    let q: BigInt = BigInt::from(modulus.to_biguint());
    let phi_m: &Vec<BigInt> = &cyclotomics.last().unwrap().1;
    phi_m
        .iter()
        .map(|c| {
            let r: BigInt = c.mod_floor(&q);
            O::from_biguint(&r.to_biguint().expect("mod_floor is non-negative"))
                .expect("coefficient is below the modulus")
        })
        .collect()
}

/// Exact division of polynomials with integer coefficients (monic divisor,
/// zero remainder), ascending-degree representation.
fn poly_div_exact(numerator: &[BigInt], denominator: &[BigInt]) -> Vec<BigInt> {
    let deg_n: usize = numerator.len() - 1;
    let deg_d: usize = denominator.len() - 1;
    debug_assert!(deg_n >= deg_d);
    debug_assert!(denominator[deg_d].is_one(), "divisor must be monic");

    let mut remainder: Vec<BigInt> = numerator.to_vec();
    let mut quotient: Vec<BigInt> = vec![BigInt::zero(); deg_n - deg_d + 1];

    for k in (0..=deg_n - deg_d).rev() {
        let coeff: BigInt = remainder[k + deg_d].clone();
        quotient[k] = coeff.clone();
        if coeff.is_zero() {
            continue;
        }
        for j in 0..=deg_d {
            let t: BigInt = &denominator[j] * &coeff;
            remainder[k + j] -= t;
        }
    }
    debug_assert!(remainder.iter().all(|c| c.is_zero()), "division not exact");
    quotient
}
