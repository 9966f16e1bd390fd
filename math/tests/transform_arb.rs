use std::sync::Arc;

use num_bigint::BigUint;
use num_traits::ToPrimitive;

use math::dft::arb;
use math::error::MathError;
use math::modulus::ModOps;
use math::nbtheory::{cyclotomic_polynomial, first_prime, root_of_unity, totient_list};
use math::ring::{RingElement, RingParams};

fn sub_test<F: FnOnce()>(name: &str, f: F) {
    println!("Running {}", name);
    f();
}

fn u64_prime(bits: u64, order: u64) -> u64 {
    first_prime(bits, order).unwrap().to_u64().unwrap()
}

/// Schoolbook product of two dimension-n polynomials reduced mod the
/// cyclotomic polynomial and q.
fn cyclotomic_mul(a: &[u64], b: &[u64], cyclo: &[u64], q: u64) -> Vec<u64> {
    let mut full: Vec<u64> = vec![0u64; a.len() + b.len() - 1];
    for (i, &ai) in a.iter().enumerate() {
        for (j, &bj) in b.iter().enumerate() {
            let prod: u64 = ((ai as u128 * bj as u128) % q as u128) as u64;
            full[i + j] = ((full[i + j] as u128 + prod as u128) % q as u128) as u64;
        }
    }

    let n: usize = cyclo.len() - 1;
    for k in (n..full.len()).rev() {
        let c: u64 = full[k];
        if c == 0 {
            continue;
        }
        full[k] = 0;
        for j in 0..n {
            let t: u64 = ((c as u128 * cyclo[j] as u128) % q as u128) as u64;
            let idx: usize = k - n + j;
            full[idx] = ((full[idx] as u128 + (q - t) as u128) % q as u128) as u64;
        }
    }
    full.truncate(n);
    full
}

fn arb_params_u64(m: usize) -> Arc<RingParams<u64>> {
    let q: u64 = u64_prime(20, 2 * m as u64);
    let root: u64 = root_of_unity(2 * m, &q).unwrap();
    let embedding: (u64, u64) = arb::shared::<u64>().precompute(m, &q).unwrap();
    assert_eq!(
        arb::shared::<u64>().bluestein().default_embedding(&q),
        Some(embedding.clone())
    );
    arb::shared::<u64>().set_cyclotomic_polynomial(m, &q, cyclotomic_polynomial(m, &q));
    Arc::new(RingParams::new_arbitrary(m, q, root, embedding.0, embedding.1).unwrap())
}

#[test]
fn transform_arb_m22() {
    let m: usize = 22;
    let params = arb_params_u64(m);
    let q: u64 = *params.modulus();

    sub_test("round_trip_known_vector", || {
        let input: Vec<u64> = (1..=10).collect();
        let mut element = RingElement::from_coefficients(&params, input.clone()).unwrap();
        element.switch_format().unwrap();
        element.switch_format().unwrap();
        assert_eq!(element.values(), input.as_slice());
    });

    sub_test("forward_evaluates_at_primitive_roots", || {
        let input: Vec<u64> = vec![5, 0, 3, 9, 1, 7, 2, 8, 4, 6];
        let mut element = RingElement::from_coefficients(&params, input.clone()).unwrap();
        element.switch_format().unwrap();

        let root: u64 = *params.root();
        for (i, &k) in totient_list(m).iter().enumerate() {
            // the element root has order 2m; the evaluation points are the
            // primitive m-th roots, powers of its square
            let point: u64 = root.pow_mod(&(2 * k as u64), &q);
            let mut expected: u64 = 0;
            for coeff in input.iter().rev() {
                expected = expected
                    .mul_mod(&point, &<u64 as ModOps>::reducer(&q))
                    .add_mod(coeff, &q);
            }
            assert_eq!(element.values()[i], expected, "evaluation point {}", k);
        }
    });

    sub_test("convolution_theorem", || {
        let cyclo: Vec<u64> = cyclotomic_polynomial(m, &q);
        let a_coeffs: Vec<u64> = vec![3, 1, 4, 1, 5, 9, 2, 6, 5, 3];
        let b_coeffs: Vec<u64> = vec![2, 7, 1, 8, 2, 8, 1, 8, 2, 8];
        let expected: Vec<u64> = cyclotomic_mul(&a_coeffs, &b_coeffs, &cyclo, q);

        let mut a = RingElement::from_coefficients(&params, a_coeffs).unwrap();
        let mut b = RingElement::from_coefficients(&params, b_coeffs).unwrap();
        a.switch_format().unwrap();
        b.switch_format().unwrap();
        let mut product = a.times(&b).unwrap();
        product.switch_format().unwrap();

        assert_eq!(product.values(), expected.as_slice());
    });
}

#[test]
fn transform_arb_m9_division_path() {
    // m = 9 is neither prime nor twice a prime, so the inverse projects
    // back through the NTT-based cyclotomic division
    let m: usize = 9;
    let params = arb_params_u64(m);

    let input: Vec<u64> = vec![11, 22, 33, 44, 55, 66];
    let mut element = RingElement::from_coefficients(&params, input.clone()).unwrap();
    element.switch_format().unwrap();
    element.switch_format().unwrap();
    assert_eq!(element.values(), input.as_slice());
}

#[test]
fn transform_arb_missing_cyclotomic_fails() {
    // same shape as the m = 9 ring but a fresh modulus whose cyclotomic
    // polynomial was never registered: the division path must fail fast
    let m: usize = 9;
    let q: u64 = u64_prime(24, 2 * m as u64);
    let root: u64 = root_of_unity(2 * m, &q).unwrap();
    let embedding: (u64, u64) = arb::shared::<u64>().precompute(m, &q).unwrap();
    let params =
        Arc::new(RingParams::new_arbitrary(m, q, root, embedding.0, embedding.1).unwrap());

    let mut element =
        RingElement::from_coefficients(&params, vec![1, 2, 3, 4, 5, 6]).unwrap();
    element.switch_format().unwrap();
    assert!(matches!(
        element.switch_format(),
        Err(MathError::MissingPrecompute { .. })
    ));
}

#[test]
fn transform_arb_missing_embedding_fails() {
    let m: usize = 22;
    let q: u64 = u64_prime(22, 2 * m as u64);
    let root: u64 = root_of_unity(2 * m, &q).unwrap();
    // params without the embedding modulus/root pair
    let params = Arc::new(RingParams::new(m, q, root).unwrap());

    let mut element =
        RingElement::from_coefficients(&params, (1..=10).collect()).unwrap();
    assert!(matches!(
        element.switch_format(),
        Err(MathError::MissingPrecompute { .. })
    ));
}

#[test]
fn transform_arb_big_modulus() {
    let m: usize = 22;
    let q: BigUint = first_prime(33, 2 * m as u64).unwrap();
    let root: BigUint = root_of_unity(2 * m, &q).unwrap();
    let embedding: (BigUint, BigUint) = arb::shared::<BigUint>().precompute(m, &q).unwrap();
    arb::shared::<BigUint>().set_cyclotomic_polynomial(m, &q, cyclotomic_polynomial(m, &q));
    let params =
        Arc::new(RingParams::new_arbitrary(m, q, root, embedding.0, embedding.1).unwrap());

    let input: Vec<BigUint> = (1u64..=10).map(BigUint::from).collect();
    let mut element = RingElement::from_coefficients(&params, input.clone()).unwrap();
    element.switch_format().unwrap();
    element.switch_format().unwrap();
    assert_eq!(element.values(), input.as_slice());
}
