use std::sync::Arc;

use rand_distr::{Distribution, Normal};
use sampling::source::Source;

use crate::modulus::ModOps;
use crate::ring::{RingElement, RingParams};

impl<O: ModOps> RingElement<O> {
    /// Uniform coefficients in [0, q), in coefficient form.
    pub fn uniform(params: &Arc<RingParams<O>>, source: &mut Source) -> Self {
        let values: Vec<O> = (0..params.ring_dimension())
            .map(|_| O::sample_uniform(params.modulus(), source))
            .collect();
        Self::from_coefficients(params, values).expect("generated vector has the ring dimension")
    }

    /// Discrete-Gaussian coefficients of the given standard deviation,
    /// rejection-bounded at 6 sigma, negatives folded to q - |v|.
    /// Coefficient form.
    pub fn gaussian(params: &Arc<RingParams<O>>, sigma: f64, source: &mut Source) -> Self {
        let dist: Normal<f64> = Normal::new(0.0, sigma).expect("sigma must be positive and finite");
        let bound: f64 = 6.0 * sigma;
        let q: &O = params.modulus();

        let values: Vec<O> = (0..params.ring_dimension())
            .map(|_| {
                let mut x: f64 = dist.sample(source);
                while x.abs() > bound {
                    x = dist.sample(source);
                }
                let magnitude: u64 = x.abs().round() as u64;
                if magnitude == 0 {
                    O::default()
                } else if x < 0.0 {
                    O::from_u64(magnitude).neg_mod(q)
                } else {
                    O::from_u64(magnitude)
                }
            })
            .collect();
        Self::from_coefficients(params, values).expect("generated vector has the ring dimension")
    }

    /// Uniform ternary coefficients over {-1, 0, 1}, with -1 stored as
    /// q - 1. Coefficient form.
    pub fn ternary(params: &Arc<RingParams<O>>, source: &mut Source) -> Self {
        let q: &O = params.modulus();
        let values: Vec<O> = (0..params.ring_dimension())
            .map(|_| match source.next_u64n(3, 3) {
                0 => O::default(),
                1 => O::from_u64(1),
                _ => O::from_u64(1).neg_mod(q),
            })
            .collect();
        Self::from_coefficients(params, values).expect("generated vector has the ring dimension")
    }
}
