pub mod sampling;

use std::sync::Arc;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::dft::{arb, ftt};
use crate::error::MathError;
use crate::modulus::ModOps;
use crate::nbtheory::{is_power_of_two, totient};
use crate::poly::Poly;

/// The two interchangeable representations of a ring element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Coefficient,
    Evaluation,
}

/// Ring parameters: cyclotomic order m, the modulus, a root of unity for
/// the transform (order m for power-of-two m, order 2m otherwise), and for
/// arbitrary orders the embedding modulus/root pair of the Bluestein path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingParams<O: ModOps> {
    cyclotomic_order: usize,
    ring_dimension: usize,
    modulus: O,
    root: O,
    embedding: Option<(O, O)>,
}

impl<O: ModOps> RingParams<O> {
    pub fn new(cyclotomic_order: usize, modulus: O, root: O) -> Result<Self, MathError> {
        if root.is_zero() || root.is_one() {
            return Err(MathError::InvalidRootOfUnity);
        }
        let ring_dimension: usize = if is_power_of_two(cyclotomic_order) {
            cyclotomic_order / 2
        } else {
            totient(cyclotomic_order)
        };
        Ok(Self {
            cyclotomic_order,
            ring_dimension,
            modulus,
            root,
            embedding: None,
        })
    }

    /// Parameters for a non-power-of-two order, carrying the embedding
    /// modulus and root the Bluestein convolution runs over.
    pub fn new_arbitrary(
        cyclotomic_order: usize,
        modulus: O,
        root: O,
        embedding_modulus: O,
        embedding_root: O,
    ) -> Result<Self, MathError> {
        let mut params: RingParams<O> = Self::new(cyclotomic_order, modulus, root)?;
        params.embedding = Some((embedding_modulus, embedding_root));
        Ok(params)
    }

    pub fn cyclotomic_order(&self) -> usize {
        self.cyclotomic_order
    }

    pub fn ring_dimension(&self) -> usize {
        self.ring_dimension
    }

    pub fn modulus(&self) -> &O {
        &self.modulus
    }

    pub fn root(&self) -> &O {
        &self.root
    }

    pub fn embedding(&self) -> Option<&(O, O)> {
        self.embedding.as_ref()
    }
}

/// Value vector tagged by its representation; switching format is the only
/// way to move between the variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormValues<O> {
    Coefficient(Poly<O>),
    Evaluation(Poly<O>),
}

impl<O: Clone + Default> FormValues<O> {
    pub fn format(&self) -> Format {
        match self {
            FormValues::Coefficient(_) => Format::Coefficient,
            FormValues::Evaluation(_) => Format::Evaluation,
        }
    }

    pub fn poly(&self) -> &Poly<O> {
        match self {
            FormValues::Coefficient(p) | FormValues::Evaluation(p) => p,
        }
    }

    fn poly_mut(&mut self) -> &mut Poly<O> {
        match self {
            FormValues::Coefficient(p) | FormValues::Evaluation(p) => p,
        }
    }
}

/// A polynomial over one modulus, tagged coefficient or evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingElement<O: ModOps> {
    params: Arc<RingParams<O>>,
    values: FormValues<O>,
}

impl<O: ModOps> RingElement<O> {
    pub fn zero(params: &Arc<RingParams<O>>, format: Format) -> Self {
        let poly: Poly<O> = Poly::new(params.ring_dimension);
        let values: FormValues<O> = match format {
            Format::Coefficient => FormValues::Coefficient(poly),
            Format::Evaluation => FormValues::Evaluation(poly),
        };
        Self {
            params: params.clone(),
            values,
        }
    }

    pub fn from_coefficients(
        params: &Arc<RingParams<O>>,
        values: Vec<O>,
    ) -> Result<Self, MathError> {
        Self::from_values(params, values, Format::Coefficient)
    }

    pub fn from_evaluations(
        params: &Arc<RingParams<O>>,
        values: Vec<O>,
    ) -> Result<Self, MathError> {
        Self::from_values(params, values, Format::Evaluation)
    }

    fn from_values(
        params: &Arc<RingParams<O>>,
        values: Vec<O>,
        format: Format,
    ) -> Result<Self, MathError> {
        if values.len() != params.ring_dimension {
            return Err(MathError::DimensionMismatch {
                expected: params.ring_dimension,
                got: values.len(),
            });
        }
        let reduced: Vec<O> = values
            .into_iter()
            .map(|v| v.reduce(&params.modulus))
            .collect();
        let poly: Poly<O> = Poly::from_vec(reduced);
        let values: FormValues<O> = match format {
            Format::Coefficient => FormValues::Coefficient(poly),
            Format::Evaluation => FormValues::Evaluation(poly),
        };
        Ok(Self {
            params: params.clone(),
            values,
        })
    }

    pub fn params(&self) -> &Arc<RingParams<O>> {
        &self.params
    }

    pub fn format(&self) -> Format {
        self.values.format()
    }

    pub fn values(&self) -> &[O] {
        &self.values.poly().0
    }

    /// Runs the transform matching the current representation: forward for
    /// coefficient form, inverse for evaluation form. The transform engine
    /// is selected by the cyclotomic order.
    pub fn switch_format(&mut self) -> Result<(), MathError> {
        let m: usize = self.params.cyclotomic_order;
        let modulus: &O = &self.params.modulus;
        let root: &O = &self.params.root;

        match &self.values {
            FormValues::Coefficient(p) => {
                let out: Vec<O> = if is_power_of_two(m) {
                    ftt::shared::<O>().forward(&p.0, root, m, modulus)?
                } else {
                    let embedding: &(O, O) =
                        self.params
                            .embedding
                            .as_ref()
                            .ok_or(MathError::MissingPrecompute {
                                what: "embedding modulus and root",
                                key: format!("({}, {})", m, modulus),
                            })?;
                    arb::shared::<O>().forward(&p.0, root, m, modulus, embedding)?
                };
                self.values = FormValues::Evaluation(Poly::from_vec(out));
            }
            FormValues::Evaluation(p) => {
                let out: Vec<O> = if is_power_of_two(m) {
                    ftt::shared::<O>().inverse(&p.0, root, m, modulus)?
                } else {
                    let embedding: &(O, O) =
                        self.params
                            .embedding
                            .as_ref()
                            .ok_or(MathError::MissingPrecompute {
                                what: "embedding modulus and root",
                                key: format!("({}, {})", m, modulus),
                            })?;
                    arb::shared::<O>().inverse(&p.0, root, m, modulus, embedding)?
                };
                self.values = FormValues::Coefficient(Poly::from_vec(out));
            }
        }
        Ok(())
    }

    /// Switches format only when the element is not already in the target.
    pub fn set_format(&mut self, format: Format) -> Result<(), MathError> {
        if self.format() != format {
            self.switch_format()?;
        }
        Ok(())
    }

    fn check_binary(&self, other: &Self) -> Result<(), MathError> {
        if self.params.cyclotomic_order != other.params.cyclotomic_order {
            return Err(MathError::ParamsMismatch("cyclotomic orders differ"));
        }
        if self.params.modulus != other.params.modulus {
            return Err(MathError::ParamsMismatch("moduli differ"));
        }
        if self.format() != other.format() {
            return Err(MathError::FormatMismatch);
        }
        Ok(())
    }

    pub fn plus(&self, other: &Self) -> Result<Self, MathError> {
        self.check_binary(other)?;
        let q: &O = &self.params.modulus;
        let values: Vec<O> = self
            .values()
            .iter()
            .zip(other.values().iter())
            .map(|(a, b)| a.add_mod(b, q))
            .collect();
        Ok(self.with_values(values))
    }

    pub fn minus(&self, other: &Self) -> Result<Self, MathError> {
        self.check_binary(other)?;
        let q: &O = &self.params.modulus;
        let values: Vec<O> = self
            .values()
            .iter()
            .zip(other.values().iter())
            .map(|(a, b)| a.sub_mod(b, q))
            .collect();
        Ok(self.with_values(values))
    }

    /// Pointwise product; the payoff for transforming. Only legal with both
    /// operands in evaluation form.
    pub fn times(&self, other: &Self) -> Result<Self, MathError> {
        self.check_binary(other)?;
        if self.format() != Format::Evaluation {
            return Err(MathError::MulRequiresEvaluation);
        }
        let red: <O as ModOps>::Reducer = O::reducer(&self.params.modulus);
        let values: Vec<O> = self
            .values()
            .iter()
            .zip(other.values().iter())
            .map(|(a, b)| a.mul_mod(b, &red))
            .collect();
        Ok(self.with_values(values))
    }

    /// Adds the scalar to the constant term; legal only in coefficient form.
    pub fn plus_scalar(&self, scalar: &O) -> Result<Self, MathError> {
        if self.format() != Format::Coefficient {
            return Err(MathError::ScalarAddRequiresCoefficient);
        }
        let q: &O = &self.params.modulus;
        let mut values: Vec<O> = self.values().to_vec();
        values[0] = values[0].add_mod(&scalar.reduce(q), q);
        Ok(self.with_values(values))
    }

    /// Subtracts the scalar from every slot.
    pub fn minus_scalar(&self, scalar: &O) -> Result<Self, MathError> {
        let q: &O = &self.params.modulus;
        let s: O = scalar.reduce(q);
        let values: Vec<O> = self.values().iter().map(|v| v.sub_mod(&s, q)).collect();
        Ok(self.with_values(values))
    }

    /// Multiplies every slot by the scalar.
    pub fn times_scalar(&self, scalar: &O) -> Result<Self, MathError> {
        let q: &O = &self.params.modulus;
        let red: <O as ModOps>::Reducer = O::reducer(q);
        let s: O = scalar.reduce(q);
        let values: Vec<O> = self.values().iter().map(|v| v.mul_mod(&s, &red)).collect();
        Ok(self.with_values(values))
    }

    pub fn negate(&self) -> Self {
        let q: &O = &self.params.modulus;
        let values: Vec<O> = self.values().iter().map(|v| v.neg_mod(q)).collect();
        self.with_values(values)
    }

    /// Rescales the values into the new modulus, treating entries above
    /// half the old modulus as negatives, and rebinds the parameters to the
    /// caller-supplied root. No transform is performed.
    pub fn switch_modulus(&mut self, new_modulus: &O, new_root: &O) -> Result<(), MathError> {
        let old: BigUint = self.params.modulus.to_biguint();
        let old_half: BigUint = &old >> 1;
        let new_big: BigInt = BigInt::from(new_modulus.to_biguint());
        let old_big: BigInt = BigInt::from(old.clone());

        for v in self.values.poly_mut().0.iter_mut() {
            let n: BigUint = v.to_biguint();
            let centered: BigInt = if n > old_half {
                BigInt::from(n) - &old_big
            } else {
                BigInt::from(n)
            };
            let reduced: BigInt = centered.mod_floor(&new_big);
            *v = O::from_biguint(&reduced.to_biguint().expect("mod_floor is non-negative"))
                .ok_or(MathError::NativeOverflow)?;
        }

        self.params = Arc::new(RingParams::new(
            self.params.cyclotomic_order,
            new_modulus.clone(),
            new_root.clone(),
        )?);
        Ok(())
    }

    /// Keeps the even-index coefficients and halves the cyclotomic order,
    /// using that the square of an m-th root of unity is an (m/2)-th root.
    /// Coefficient form, power-of-two order only.
    pub fn decompose(&mut self) -> Result<(), MathError> {
        if self.format() != Format::Coefficient {
            return Err(MathError::WrongFormat {
                required: "coefficient",
            });
        }
        let m: usize = self.params.cyclotomic_order;
        if !is_power_of_two(m) {
            return Err(MathError::NonPowerOfTwoOrder(m));
        }

        let halved: Vec<O> = self
            .values()
            .iter()
            .step_by(2)
            .cloned()
            .collect();

        self.params = Arc::new(RingParams::new(
            m / 2,
            self.params.modulus.clone(),
            self.params.root.clone(),
        )?);
        self.values = FormValues::Coefficient(Poly::from_vec(halved));
        Ok(())
    }

    /// The Galois automorphism x -> x^k for odd k, applied in coefficient
    /// form: coefficient i moves to (i * k) mod m, negated when the image
    /// wraps past the ring dimension. Power-of-two order only.
    pub fn automorphism(&self, k: usize) -> Result<Self, MathError> {
        let m: usize = self.params.cyclotomic_order;
        let n: usize = self.params.ring_dimension;
        if !is_power_of_two(m) {
            return Err(MathError::NonPowerOfTwoOrder(m));
        }
        if k % 2 == 0 {
            return Err(MathError::ParamsMismatch(
                "automorphism index must be odd",
            ));
        }
        if self.format() != Format::Coefficient {
            return Err(MathError::WrongFormat {
                required: "coefficient",
            });
        }

        let q: &O = &self.params.modulus;
        let mut out: Vec<O> = vec![O::default(); n];
        for (i, v) in self.values().iter().enumerate() {
            let e: usize = (i * k) % m;
            if e < n {
                out[e] = v.clone();
            } else {
                out[e - n] = v.neg_mod(q);
            }
        }
        Ok(self.with_values(out))
    }

    fn with_values(&self, values: Vec<O>) -> Self {
        let poly: Poly<O> = Poly::from_vec(values);
        let form: FormValues<O> = match self.format() {
            Format::Coefficient => FormValues::Coefficient(poly),
            Format::Evaluation => FormValues::Evaluation(poly),
        };
        Self {
            params: self.params.clone(),
            values: form,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nbtheory::root_of_unity;

    fn params_pow2() -> Arc<RingParams<u64>> {
        let q: u64 = 0x1fffffffffe00001u64;
        let m: usize = 16;
        let root: u64 = root_of_unity(m, &q).unwrap();
        Arc::new(RingParams::new(m, q, root).unwrap())
    }

    #[test]
    fn test_format_misuse_is_rejected() {
        let params = params_pow2();
        let a = RingElement::from_coefficients(&params, (1..=8).collect()).unwrap();
        let mut b = RingElement::from_coefficients(&params, (2..=9).collect()).unwrap();

        // coefficient-form multiplication is not supported
        assert_eq!(a.times(&b), Err(MathError::MulRequiresEvaluation));

        b.switch_format().unwrap();
        assert_eq!(a.plus(&b), Err(MathError::FormatMismatch));

        // scalar add to the constant term needs coefficient form
        assert_eq!(
            b.plus_scalar(&3),
            Err(MathError::ScalarAddRequiresCoefficient)
        );
        assert!(a.plus_scalar(&3).is_ok());
    }

    #[test]
    fn test_plus_minus() {
        let params = params_pow2();
        let q: u64 = *params.modulus();
        let a = RingElement::from_coefficients(&params, vec![q - 1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let b = RingElement::from_coefficients(&params, vec![2, 3, 4, 5, 6, 7, 8, 9]).unwrap();
        let sum = a.plus(&b).unwrap();
        assert_eq!(sum.values()[0], 1);
        assert_eq!(sum.values()[1], 5);
        let diff = sum.minus(&b).unwrap();
        assert_eq!(diff.values(), a.values());
    }

    #[test]
    fn test_scalar_ops() {
        let params = params_pow2();
        let a = RingElement::from_coefficients(&params, (1..=8).collect()).unwrap();
        let plus = a.plus_scalar(&10).unwrap();
        assert_eq!(plus.values()[0], 11);
        assert_eq!(plus.values()[1], 2);

        let minus = a.minus_scalar(&1).unwrap();
        assert_eq!(minus.values()[0], 0);
        assert_eq!(minus.values()[7], 7);

        let times = a.times_scalar(&3).unwrap();
        assert_eq!(times.values()[0], 3);
        assert_eq!(times.values()[7], 24);
    }

    #[test]
    fn test_switch_modulus_recenters() {
        let q: u64 = 97;
        let m: usize = 8;
        // 97 = 1 mod 8, a root of order 8 exists
        let root: u64 = root_of_unity(m, &q).unwrap();
        let params = Arc::new(RingParams::new(m, q, root).unwrap());

        // values 96 and 50 sit above q/2 = 48 and act as -1 and -47
        let mut a = RingElement::from_coefficients(&params, vec![96, 50, 3, 0]).unwrap();
        let new_q: u64 = 193;
        let new_root: u64 = root_of_unity(m, &new_q).unwrap();
        a.switch_modulus(&new_q, &new_root).unwrap();
        assert_eq!(a.values(), &[192, 146, 3, 0]);
        assert_eq!(*a.params().modulus(), new_q);
    }

    #[test]
    fn test_decompose_halves_dimension() {
        let params = params_pow2();
        let mut a = RingElement::from_coefficients(&params, (1..=8).collect()).unwrap();
        a.decompose().unwrap();
        assert_eq!(a.params().cyclotomic_order(), 8);
        assert_eq!(a.values(), &[1, 3, 5, 7]);
    }

    #[test]
    fn test_automorphism_round_trip() {
        let params = params_pow2();
        let m: usize = params.cyclotomic_order();
        let a = RingElement::from_coefficients(&params, (1..=8).collect()).unwrap();

        let k: usize = 3;
        let k_inv: usize = (k as u64).inv_mod(&(m as u64)).unwrap() as usize;
        let mapped = a.automorphism(k).unwrap();
        let back = mapped.automorphism(k_inv).unwrap();
        assert_eq!(back.values(), a.values());
    }
}
