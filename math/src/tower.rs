use std::sync::Arc;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::ToPrimitive;
use rand_distr::{Distribution, Normal};
use sampling::source::Source;

use crate::error::MathError;
use crate::modulus::prime::NttFriendlyPrimeGenerator;
use crate::modulus::ModOps;
use crate::nbtheory::{is_power_of_two, root_of_unity};
use crate::ring::{Format, RingElement, RingParams};

/// Per-tower CRT reconstruction factors (Q/q_i) * ((Q/q_i)^{-1} mod q_i).
fn crt_multipliers(moduli: &[u64], composite: &BigUint) -> Vec<BigUint> {
    moduli
        .iter()
        .map(|&q_i| {
            let q_i_big: BigUint = BigUint::from(q_i);
            let div_by: BigUint = composite / &q_i_big;
            let inv: BigUint = (&div_by % &q_i_big)
                .modinv(&q_i_big)
                .expect("tower moduli are pairwise coprime");
            div_by * inv
        })
        .collect()
}

/// Parameters of a double-CRT representation: one native-modulus ring per
/// tower, all sharing the cyclotomic order, with the composite modulus equal
/// to the product of the tower moduli.
#[derive(Clone, Debug)]
pub struct TowerParams {
    cyclotomic_order: usize,
    towers: Vec<Arc<RingParams<u64>>>,
    modulus: BigUint,
}

impl TowerParams {
    pub fn new(
        cyclotomic_order: usize,
        moduli: &[u64],
        roots: &[u64],
    ) -> Result<Self, MathError> {
        if moduli.is_empty() {
            return Err(MathError::EmptyTowers);
        }
        if moduli.len() != roots.len() {
            return Err(MathError::ParamsMismatch(
                "tower moduli and roots differ in length",
            ));
        }
        let towers: Vec<Arc<RingParams<u64>>> = moduli
            .iter()
            .zip(roots.iter())
            .map(|(&q, &r)| RingParams::new(cyclotomic_order, q, r).map(Arc::new))
            .collect::<Result<_, _>>()?;
        let modulus: BigUint = moduli.iter().map(|&q| BigUint::from(q)).product();
        Ok(Self {
            cyclotomic_order,
            towers,
            modulus,
        })
    }

    /// Generates count NTT-friendly tower moduli of the target bit size and
    /// their roots of unity. Power-of-two orders only, as the underlying
    /// prime walk steps by the order.
    pub fn generate(
        cyclotomic_order: usize,
        count: usize,
        bits: u64,
    ) -> Result<Self, MathError> {
        if !is_power_of_two(cyclotomic_order) {
            return Err(MathError::NonPowerOfTwoOrder(cyclotomic_order));
        }
        let mut generator: NttFriendlyPrimeGenerator =
            NttFriendlyPrimeGenerator::new(bits, cyclotomic_order as u64);
        let moduli: Vec<u64> = generator.next_alternating_primes(count)?;
        let roots: Vec<u64> = moduli
            .iter()
            .map(|q| root_of_unity(cyclotomic_order, q))
            .collect::<Result<_, _>>()?;
        Self::new(cyclotomic_order, &moduli, &roots)
    }

    pub fn cyclotomic_order(&self) -> usize {
        self.cyclotomic_order
    }

    pub fn ring_dimension(&self) -> usize {
        self.towers[0].ring_dimension()
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn towers(&self) -> &[Arc<RingParams<u64>>] {
        &self.towers
    }

    pub fn moduli(&self) -> Vec<u64> {
        self.towers.iter().map(|t| *t.modulus()).collect()
    }

    pub fn roots(&self) -> Vec<u64> {
        self.towers.iter().map(|t| *t.root()).collect()
    }

    /// The CRT combination of the tower roots: a root of unity of the same
    /// order for the composite modulus, congruent to each tower root.
    pub fn crt_root(&self) -> BigUint {
        crt_root(&self.moduli(), &self.roots(), &self.modulus)
    }

    /// Big-modulus ring parameters matching this decomposition.
    pub fn crt_params(&self) -> Result<Arc<RingParams<BigUint>>, MathError> {
        Ok(Arc::new(RingParams::new(
            self.cyclotomic_order,
            self.modulus.clone(),
            self.crt_root(),
        )?))
    }
}

fn crt_root(moduli: &[u64], roots: &[u64], composite: &BigUint) -> BigUint {
    let multipliers: Vec<BigUint> = crt_multipliers(moduli, composite);
    let mut root: BigUint = BigUint::from(0u32);
    for (r, mult) in roots.iter().zip(multipliers.iter()) {
        root += BigUint::from(*r) * mult;
    }
    root % composite
}

/// A double-CRT polynomial: one native-modulus RingElement per tower, all
/// sharing cyclotomic order and format; the composite modulus always equals
/// the live product of the tower moduli.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TowerDecomposition {
    cyclotomic_order: usize,
    modulus: BigUint,
    towers: Vec<RingElement<u64>>,
}

impl TowerDecomposition {
    /// Decomposes a big-modulus element by reducing its vector mod each
    /// tower modulus; every tower inherits the source format.
    pub fn from_big_element(
        element: &RingElement<BigUint>,
        params: &TowerParams,
    ) -> Result<Self, MathError> {
        if element.params().cyclotomic_order() != params.cyclotomic_order {
            return Err(MathError::ParamsMismatch("cyclotomic orders differ"));
        }

        let format: Format = element.format();
        let towers: Vec<RingElement<u64>> = params
            .towers
            .iter()
            .map(|tower_params| {
                let q_i: BigUint = BigUint::from(*tower_params.modulus());
                let values: Vec<u64> = element
                    .values()
                    .iter()
                    .map(|v| (v % &q_i).to_u64().expect("residue fits the native word"))
                    .collect();
                match format {
                    Format::Coefficient => RingElement::from_coefficients(tower_params, values),
                    Format::Evaluation => RingElement::from_evaluations(tower_params, values),
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            cyclotomic_order: params.cyclotomic_order,
            modulus: params.modulus.clone(),
            towers,
        })
    }

    /// Uniform decomposition: a uniform big-modulus element reduced into
    /// every tower. Coefficient form.
    pub fn uniform(params: &TowerParams, source: &mut Source) -> Result<Self, MathError> {
        let big_params: Arc<RingParams<BigUint>> = params.crt_params()?;
        let element: RingElement<BigUint> = RingElement::uniform(&big_params, source);
        Self::from_big_element(&element, params)
    }

    /// Gaussian decomposition: one centered integer sample per coefficient,
    /// folded into every tower so all towers represent the same polynomial.
    /// Coefficient form.
    pub fn gaussian(
        params: &TowerParams,
        sigma: f64,
        source: &mut Source,
    ) -> Result<Self, MathError> {
        let dist: Normal<f64> = Normal::new(0.0, sigma).expect("sigma must be positive and finite");
        let bound: f64 = 6.0 * sigma;
        let n: usize = params.ring_dimension();

        let samples: Vec<i64> = (0..n)
            .map(|_| {
                let mut x: f64 = dist.sample(source);
                while x.abs() > bound {
                    x = dist.sample(source);
                }
                x.round() as i64
            })
            .collect();

        let towers: Vec<RingElement<u64>> = params
            .towers
            .iter()
            .map(|tower_params| {
                let q: u64 = *tower_params.modulus();
                let values: Vec<u64> = samples
                    .iter()
                    .map(|&k| if k < 0 { q - k.unsigned_abs() } else { k as u64 })
                    .collect();
                RingElement::from_coefficients(tower_params, values)
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            cyclotomic_order: params.cyclotomic_order,
            modulus: params.modulus.clone(),
            towers,
        })
    }

    /// Ternary decomposition over {-1, 0, 1}, shared across towers.
    /// Coefficient form.
    pub fn ternary(params: &TowerParams, source: &mut Source) -> Result<Self, MathError> {
        let n: usize = params.ring_dimension();
        let samples: Vec<i64> = (0..n)
            .map(|_| source.next_u64n(3, 3) as i64 - 1)
            .collect();

        let towers: Vec<RingElement<u64>> = params
            .towers
            .iter()
            .map(|tower_params| {
                let q: u64 = *tower_params.modulus();
                let values: Vec<u64> = samples
                    .iter()
                    .map(|&k| if k < 0 { q - 1 } else { k as u64 })
                    .collect();
                RingElement::from_coefficients(tower_params, values)
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            cyclotomic_order: params.cyclotomic_order,
            modulus: params.modulus.clone(),
            towers,
        })
    }

    pub fn cyclotomic_order(&self) -> usize {
        self.cyclotomic_order
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn towers(&self) -> &[RingElement<u64>] {
        &self.towers
    }

    pub fn len(&self) -> usize {
        self.towers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.towers.is_empty()
    }

    pub fn format(&self) -> Format {
        self.towers[0].format()
    }

    /// Switches every tower between coefficient and evaluation form.
    /// Towers are independent; pre-warming each tower's tables lets callers
    /// fan this out across threads.
    pub fn switch_format(&mut self) -> Result<(), MathError> {
        for tower in self.towers.iter_mut() {
            tower.switch_format()?;
        }
        Ok(())
    }

    pub fn set_format(&mut self, format: Format) -> Result<(), MathError> {
        if self.format() != format {
            self.switch_format()?;
        }
        Ok(())
    }

    fn check_binary(&self, other: &Self) -> Result<(), MathError> {
        if self.cyclotomic_order != other.cyclotomic_order {
            return Err(MathError::ParamsMismatch("cyclotomic orders differ"));
        }
        if self.towers.len() != other.towers.len() || self.modulus != other.modulus {
            return Err(MathError::TowerMismatch);
        }
        Ok(())
    }

    pub fn plus(&self, other: &Self) -> Result<Self, MathError> {
        self.check_binary(other)?;
        self.delegate(other, RingElement::plus)
    }

    pub fn minus(&self, other: &Self) -> Result<Self, MathError> {
        self.check_binary(other)?;
        self.delegate(other, RingElement::minus)
    }

    pub fn times(&self, other: &Self) -> Result<Self, MathError> {
        self.check_binary(other)?;
        self.delegate(other, RingElement::times)
    }

    fn delegate(
        &self,
        other: &Self,
        op: fn(&RingElement<u64>, &RingElement<u64>) -> Result<RingElement<u64>, MathError>,
    ) -> Result<Self, MathError> {
        let towers: Vec<RingElement<u64>> = self
            .towers
            .iter()
            .zip(other.towers.iter())
            .map(|(a, b)| op(a, b))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            cyclotomic_order: self.cyclotomic_order,
            modulus: self.modulus.clone(),
            towers,
        })
    }

    pub fn negate(&self) -> Self {
        Self {
            cyclotomic_order: self.cyclotomic_order,
            modulus: self.modulus.clone(),
            towers: self.towers.iter().map(RingElement::negate).collect(),
        }
    }

    /// Reconstructs the unique big-modulus element congruent to every tower:
    /// sum of tower_i * (Q/q_i) * ((Q/q_i)^{-1} mod q_i) mod Q, slot by
    /// slot. The expensive way out of the CRT domain; used sparingly.
    pub fn crt_interpolate(&self) -> Result<RingElement<BigUint>, MathError> {
        if self.towers.is_empty() {
            return Err(MathError::EmptyTowers);
        }

        let moduli: Vec<u64> = self.towers.iter().map(|t| *t.params().modulus()).collect();
        let roots: Vec<u64> = self.towers.iter().map(|t| *t.params().root()).collect();
        let multipliers: Vec<BigUint> = crt_multipliers(&moduli, &self.modulus);

        let n: usize = self.towers[0].values().len();
        let mut coefficients: Vec<BigUint> = Vec::with_capacity(n);
        for j in 0..n {
            let mut acc: BigUint = BigUint::from(0u32);
            for (tower, mult) in self.towers.iter().zip(multipliers.iter()) {
                acc += BigUint::from(tower.values()[j]) * mult;
            }
            coefficients.push(acc % &self.modulus);
        }

        let params: Arc<RingParams<BigUint>> = Arc::new(RingParams::new(
            self.cyclotomic_order,
            self.modulus.clone(),
            crt_root(&moduli, &roots, &self.modulus),
        )?);
        match self.format() {
            Format::Coefficient => RingElement::from_coefficients(&params, coefficients),
            Format::Evaluation => RingElement::from_evaluations(&params, coefficients),
        }
    }

    /// Removes the last tower and shrinks the composite modulus to the
    /// product of the remaining tower moduli. Irreversible.
    pub fn drop_last_element(&mut self) -> Result<(), MathError> {
        let last: RingElement<u64> = self.towers.pop().ok_or(MathError::EmptyTowers)?;
        self.modulus = &self.modulus / BigUint::from(*last.params().modulus());
        Ok(())
    }

    /// Modulus reduction from Q to Q/q_t, q_t the last tower modulus:
    /// computes a correction divisible by the plaintext modulus that makes
    /// the element divisible by q_t, adds it, drops the last tower, and
    /// rescales the survivors by q_t^{-1}. Expects evaluation format and
    /// returns in it. Irreversible.
    pub fn mod_reduce(&mut self, plaintext_modulus: u64) -> Result<(), MathError> {
        if self.format() != Format::Evaluation {
            return Err(MathError::WrongFormat {
                required: "evaluation",
            });
        }
        if self.towers.len() < 2 {
            return Err(MathError::ParamsMismatch(
                "modulus reduction needs at least two towers",
            ));
        }

        self.switch_format()?;

        let q_t: u64 = *self.towers.last().expect("tower count checked").params().modulus();
        let v: u64 = q_t.reduce(&plaintext_modulus).inv_mod(&plaintext_modulus)?;
        let pq_t: BigUint = BigUint::from(plaintext_modulus) * BigUint::from(q_t);
        let pq_t_int: BigInt = BigInt::from(pq_t.clone());
        let pq_t_half: BigInt = BigInt::from(&pq_t >> 1);
        // a = v * q_t - 1 mod p*q_t; congruent to -1 mod q_t and 0 mod p
        let a: BigUint = (BigUint::from(v) * BigUint::from(q_t) + &pq_t - BigUint::from(1u32)) % &pq_t;
        let a_int: BigInt = BigInt::from(a);

        let q_t_half: u64 = q_t >> 1;
        let last_values: Vec<u64> = self.towers.last().expect("tower count checked").values().to_vec();

        // centered correction per coefficient, then folded into each
        // surviving tower
        let deltas: Vec<BigInt> = last_values
            .iter()
            .map(|&d| {
                let centered: BigInt = if d > q_t_half {
                    BigInt::from(d) - BigInt::from(q_t)
                } else {
                    BigInt::from(d)
                };
                let mut delta: BigInt = (&a_int * centered).mod_floor(&pq_t_int);
                if delta > pq_t_half {
                    delta -= &pq_t_int;
                }
                delta
            })
            .collect();

        let survivors: usize = self.towers.len() - 1;
        for i in 0..survivors {
            let tower_params: Arc<RingParams<u64>> = self.towers[i].params().clone();
            let q_i: u64 = *tower_params.modulus();
            let q_i_int: BigInt = BigInt::from(q_i);
            let values: Vec<u64> = self.towers[i]
                .values()
                .iter()
                .zip(deltas.iter())
                .map(|(&c, delta)| {
                    let temp: u64 = delta
                        .mod_floor(&q_i_int)
                        .to_u64()
                        .expect("residue fits the native word");
                    c.add_mod(&temp, &q_i)
                })
                .collect();
            self.towers[i] = RingElement::from_coefficients(&tower_params, values)?;
        }

        self.drop_last_element()?;

        for tower in self.towers.iter_mut() {
            let q_i: u64 = *tower.params().modulus();
            let scale: u64 = q_t.reduce(&q_i).inv_mod(&q_i)?;
            *tower = tower.times_scalar(&scale)?;
        }

        self.switch_format()
    }
}
