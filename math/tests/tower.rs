use std::sync::Arc;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{Signed, Zero};
use sampling::source::Source;

use math::dft::ftt;
use math::error::MathError;
use math::ring::{Format, RingElement, RingParams};
use math::tower::{TowerDecomposition, TowerParams};

fn sub_test<F: FnOnce()>(name: &str, f: F) {
    println!("Running {}", name);
    f();
}

fn three_towers(m: usize) -> TowerParams {
    TowerParams::generate(m, 3, 40).unwrap()
}

fn big_params(params: &TowerParams) -> Arc<RingParams<BigUint>> {
    params.crt_params().unwrap()
}

#[test]
fn tower_crt_round_trip() {
    let m: usize = 16;
    let params: TowerParams = three_towers(m);
    let big = big_params(&params);

    sub_test("known_small_vector", || {
        let input: Vec<BigUint> = (0..8u64).map(|j| BigUint::from(j * 7 + 1)).collect();
        let element = RingElement::from_coefficients(&big, input.clone()).unwrap();
        let decomposition = TowerDecomposition::from_big_element(&element, &params).unwrap();
        assert_eq!(decomposition.len(), 3);
        assert_eq!(decomposition.modulus(), params.modulus());

        let back = decomposition.crt_interpolate().unwrap();
        assert_eq!(back.values(), input.as_slice());
    });

    sub_test("uniform_vector", || {
        let mut source = Source::new([21u8; 32]);
        let element = RingElement::uniform(&big, &mut source);
        let decomposition = TowerDecomposition::from_big_element(&element, &params).unwrap();
        let back = decomposition.crt_interpolate().unwrap();
        assert_eq!(back.values(), element.values());
    });
}

#[test]
fn tower_drop_last_element() {
    let m: usize = 16;
    let params: TowerParams = three_towers(m);
    let big = big_params(&params);

    let mut source = Source::new([23u8; 32]);
    let element = RingElement::uniform(&big, &mut source);
    let mut decomposition = TowerDecomposition::from_big_element(&element, &params).unwrap();

    let moduli: Vec<u64> = params.moduli();
    decomposition.drop_last_element().unwrap();

    let expected_modulus: BigUint = BigUint::from(moduli[0]) * BigUint::from(moduli[1]);
    assert_eq!(decomposition.len(), 2);
    assert_eq!(decomposition.modulus(), &expected_modulus);

    // interpolation now reproduces the original value mod the shrunk modulus
    let back = decomposition.crt_interpolate().unwrap();
    for (v, original) in back.values().iter().zip(element.values().iter()) {
        assert_eq!(*v, original % &expected_modulus);
    }
}

#[test]
fn tower_arithmetic_delegates_per_tower() {
    let m: usize = 16;
    let params: TowerParams = three_towers(m);
    let big = big_params(&params);
    let q_big: &BigUint = params.modulus();

    let mut source = Source::new([25u8; 32]);
    let a_big = RingElement::uniform(&big, &mut source);
    let b_big = RingElement::uniform(&big, &mut source);
    let a = TowerDecomposition::from_big_element(&a_big, &params).unwrap();
    let b = TowerDecomposition::from_big_element(&b_big, &params).unwrap();

    sub_test("plus_matches_big_addition", || {
        let sum = a.plus(&b).unwrap();
        let back = sum.crt_interpolate().unwrap();
        for ((x, y), z) in a_big
            .values()
            .iter()
            .zip(b_big.values().iter())
            .zip(back.values().iter())
        {
            assert_eq!((x + y) % q_big, *z);
        }
    });

    sub_test("minus_matches_big_subtraction", || {
        let diff = a.minus(&b).unwrap();
        let back = diff.crt_interpolate().unwrap();
        for ((x, y), z) in a_big
            .values()
            .iter()
            .zip(b_big.values().iter())
            .zip(back.values().iter())
        {
            assert_eq!((x + q_big - y) % q_big, *z);
        }
    });

    sub_test("times_requires_evaluation", || {
        assert_eq!(a.times(&b), Err(MathError::MulRequiresEvaluation));
    });
}

#[test]
fn tower_switch_format_and_times() {
    let m: usize = 16;
    let params: TowerParams = three_towers(m);

    // pre-warm every tower's tables before the per-tower fan-out
    ftt::shared::<u64>()
        .precompute_chain(&params.roots(), m, &params.moduli())
        .unwrap();

    let mut source = Source::new([27u8; 32]);
    let mut a = TowerDecomposition::gaussian(&params, 3.2, &mut source).unwrap();
    let original = a.clone();

    a.switch_format().unwrap();
    assert_eq!(a.format(), Format::Evaluation);
    let product = a.times(&a).unwrap();
    assert_eq!(product.format(), Format::Evaluation);

    a.switch_format().unwrap();
    assert_eq!(a, original);
}

#[test]
fn tower_mod_reduce_preserves_plaintext() {
    let m: usize = 16;
    let n: usize = 8;
    let p: u64 = 5;
    let params: TowerParams = three_towers(m);
    let big = big_params(&params);

    // small ciphertext-like coefficients: plaintext plus a multiple of p
    let input: Vec<BigUint> = (0..n as u64)
        .map(|j| BigUint::from((j % p) + p * (j + 2)))
        .collect();
    let element = RingElement::from_coefficients(&big, input.clone()).unwrap();
    let mut decomposition = TowerDecomposition::from_big_element(&element, &params).unwrap();

    let q_t: u64 = *params.moduli().last().unwrap();

    decomposition.switch_format().unwrap();
    decomposition.mod_reduce(p).unwrap();
    assert_eq!(decomposition.format(), Format::Evaluation);
    assert_eq!(decomposition.len(), 2);

    decomposition.switch_format().unwrap();
    let back = decomposition.crt_interpolate().unwrap();
    let new_modulus: BigInt = BigInt::from(decomposition.modulus().clone());
    let half: BigInt = &new_modulus >> 1;

    // the reduced element times q_t is congruent to the original mod p:
    // the correction added before dropping the tower was divisible by p
    for (v, original) in back.values().iter().zip(input.iter()) {
        let mut centered: BigInt = BigInt::from(v.clone());
        if centered > half {
            centered -= &new_modulus;
        }
        let lhs: BigInt = centered.clone() * BigInt::from(q_t) - BigInt::from(original.clone());
        assert!(
            lhs.mod_floor(&BigInt::from(p)).is_zero(),
            "plaintext residue not preserved: {}",
            lhs
        );
        // the rescaled value is small, as the correction was centered
        assert!(centered.abs() < BigInt::from(4 * p * (n as u64 + 3)));
    }
}

#[test]
fn tower_generators_share_one_polynomial() {
    let m: usize = 16;
    let params: TowerParams = three_towers(m);
    let moduli: Vec<u64> = params.moduli();

    let mut source = Source::new([29u8; 32]);
    let g = TowerDecomposition::gaussian(&params, 3.2, &mut source).unwrap();
    let t = TowerDecomposition::ternary(&params, &mut source).unwrap();

    for decomposition in [&g, &t] {
        for j in 0..params.ring_dimension() {
            let centered: Vec<i64> = decomposition
                .towers()
                .iter()
                .zip(moduli.iter())
                .map(|(tower, &q)| {
                    let v: u64 = tower.values()[j];
                    if v > q / 2 {
                        v as i64 - q as i64
                    } else {
                        v as i64
                    }
                })
                .collect();
            assert!(centered.windows(2).all(|w| w[0] == w[1]));
        }
    }
}

#[test]
fn tower_uniform_decomposition_interpolates_in_range() {
    let m: usize = 16;
    let params: TowerParams = three_towers(m);
    let mut source = Source::new([31u8; 32]);
    let u = TowerDecomposition::uniform(&params, &mut source).unwrap();
    let back = u.crt_interpolate().unwrap();
    for v in back.values() {
        assert!(v < params.modulus());
    }
}
