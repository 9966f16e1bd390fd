use std::sync::Arc;

use num_bigint::BigUint;

use math::dft::ftt::FttTables;
use math::modulus::ModOps;
use math::nbtheory::{first_prime, root_of_unity};
use math::ring::{Format, RingElement, RingParams};

fn sub_test<F: FnOnce()>(name: &str, f: F) {
    println!("Running {}", name);
    f();
}

/// Schoolbook negacyclic product: a * b mod (x^n + 1, q).
fn negacyclic_mul(a: &[u64], b: &[u64], q: u64) -> Vec<u64> {
    let n: usize = a.len();
    let mut out: Vec<u64> = vec![0u64; n];
    for i in 0..n {
        for j in 0..n {
            let prod: u64 = ((a[i] as u128 * b[j] as u128) % q as u128) as u64;
            let k: usize = i + j;
            if k < n {
                out[k] = ((out[k] as u128 + prod as u128) % q as u128) as u64;
            } else {
                out[k - n] = ((out[k - n] as u128 + (q - prod) as u128) % q as u128) as u64;
            }
        }
    }
    out
}

#[test]
fn transform_pow2_u64() {
    let q: u64 = 0x1fffffffffe00001u64;
    let m: usize = 16;
    let root: u64 = root_of_unity(m, &q).unwrap();
    let params = Arc::new(RingParams::new(m, q, root).unwrap());

    sub_test("round_trip_known_vector", || {
        let input: Vec<u64> = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let mut element = RingElement::from_coefficients(&params, input.clone()).unwrap();
        element.switch_format().unwrap();
        assert_eq!(element.format(), Format::Evaluation);
        element.switch_format().unwrap();
        assert_eq!(element.format(), Format::Coefficient);
        assert_eq!(element.values(), input.as_slice());
    });

    sub_test("linearity", || {
        let a = RingElement::from_coefficients(&params, (1..=8).collect()).unwrap();
        let b = RingElement::from_coefficients(&params, (0..8).map(|i| i * i + 5).collect())
            .unwrap();
        let sum = a.plus(&b).unwrap();

        let mut fa = a.clone();
        fa.switch_format().unwrap();
        let mut fb = b.clone();
        fb.switch_format().unwrap();
        let mut fsum = sum.clone();
        fsum.switch_format().unwrap();

        assert_eq!(fsum, fa.plus(&fb).unwrap());
    });

    sub_test("convolution_theorem", || {
        let a_coeffs: Vec<u64> = vec![3, 1, 4, 1, 5, 9, 2, 6];
        let b_coeffs: Vec<u64> = vec![2, 7, 1, 8, 2, 8, 1, 8];
        let expected: Vec<u64> = negacyclic_mul(&a_coeffs, &b_coeffs, q);

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
fn transform_pow2_big_modulus() {
    // a modulus beyond the native word, exercising the multiprecision path
    let m: usize = 16;
    let q: BigUint = first_prime(70, m as u64).unwrap();
    let root: BigUint = root_of_unity(m, &q).unwrap();
    let params = Arc::new(RingParams::new(m, q.clone(), root).unwrap());

    sub_test("round_trip_known_vector_big", || {
        let input: Vec<BigUint> = (1u64..=8).map(BigUint::from).collect();
        let mut element = RingElement::from_coefficients(&params, input.clone()).unwrap();
        element.switch_format().unwrap();
        element.switch_format().unwrap();
        assert_eq!(element.values(), input.as_slice());
    });

    sub_test("round_trip_large_values_big", || {
        let input: Vec<BigUint> = (1u64..=8).map(|i| (&q - BigUint::from(i * 17))).collect();
        let mut element = RingElement::from_coefficients(&params, input.clone()).unwrap();
        element.switch_format().unwrap();
        element.switch_format().unwrap();
        assert_eq!(element.values(), input.as_slice());
    });
}

#[test]
fn transform_pow2_concurrent_first_use() {
    let q: u64 = 0x1fffffffffc80001u64;
    let m: usize = 64;
    let root: u64 = root_of_unity(m, &q).unwrap();
    let tables: Arc<FttTables<u64>> = Arc::new(FttTables::new());

    let input: Vec<u64> = (0..32).map(|i| i * 31 + 7).collect();
    let reference: Vec<u64> = tables.forward(&input, &root, m, &q).unwrap();
    tables.reset();

    // concurrent first use of one modulus key: builders serialize on the
    // cache lock and every thread sees a fully built table
    let handles: Vec<std::thread::JoinHandle<Vec<u64>>> = (0..4)
        .map(|_| {
            let tables = tables.clone();
            let input = input.clone();
            std::thread::spawn(move || tables.forward(&input, &root, m, &q).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), reference);
    }
}

#[test]
fn transform_pow2_strided_reuse_across_orders() {
    // one table built for m = 64 serves the m = 16 transform of the same
    // modulus through the ring-dimension stride, when the smaller root is
    // the matching power of the larger one
    let q: u64 = 0x1fffffffffb40001u64;
    let big_m: usize = 64;
    let root: u64 = root_of_unity(big_m, &q).unwrap();
    let tables: FttTables<u64> = FttTables::new();
    tables.precompute(&root, big_m, &q).unwrap();

    let small_m: usize = 16;
    let small_root: u64 = root.pow_mod(&((big_m / small_m) as u64), &q);

    let input: Vec<u64> = (1..=8).collect();
    let fwd: Vec<u64> = tables.forward(&input, &small_root, small_m, &q).unwrap();
    let back: Vec<u64> = tables.inverse(&fwd, &small_root, small_m, &q).unwrap();
    assert_eq!(back, input);

    // the dedicated small table gives identical results
    let fresh: FttTables<u64> = FttTables::new();
    assert_eq!(
        fresh.forward(&input, &small_root, small_m, &q).unwrap(),
        fwd
    );
}
