use std::sync::{Arc, Mutex, OnceLock};

use itertools::izip;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use utils::map::Map;

use crate::dft::bluestein::{embedding_dim, BluesteinTables};
use crate::dft::ntt::{self, TwiddleTable};
use crate::error::MathError;
use crate::modulus::ModOps;
use crate::nbtheory::{totient, totient_list};

/// Precomputation for the NTT-based reduction mod the m-th cyclotomic
/// polynomial: the division transform tables and the NTT images of the
/// cyclotomic polynomial and of its reversed inverse mod x^(m - n).
#[derive(Clone, Debug)]
pub struct DivisionEntry<O: ModOps> {
    dim: usize,
    embedding_modulus: O,
    forward: TwiddleTable<O>,
    inverse: TwiddleTable<O>,
    cyclo_ntt: Vec<O>,
    cyclo_inv_ntt: Vec<O>,
}

struct ArbInner<O: ModOps> {
    /// (order, modulus) -> coefficients of the m-th cyclotomic polynomial.
    cyclotomic: Map<(usize, O), Arc<Vec<O>>>,
    /// (order, modulus) -> division precomputation.
    division: Map<(usize, O), Arc<DivisionEntry<O>>>,
}

/// Transform engine for non-power-of-two cyclotomic orders: Bluestein's
/// algorithm over an embedding NTT, plus NTT-based division to project the
/// length-m inverse back onto the ring of dimension phi(m).
///
/// All caches are keyed by (order, modulus), so rings of different orders
/// can be used concurrently against the same service.
pub struct ArbTables<O: ModOps> {
    bluestein: BluesteinTables<O>,
    inner: Mutex<ArbInner<O>>,
}

impl<O: ModOps> ArbTables<O> {
    pub fn new() -> Self {
        Self {
            bluestein: BluesteinTables::new(),
            inner: Mutex::new(ArbInner {
                cyclotomic: Map::new(),
                division: Map::new(),
            }),
        }
    }

    pub fn bluestein(&self) -> &BluesteinTables<O> {
        &self.bluestein
    }

    /// Registers the m-th cyclotomic polynomial reduced mod the modulus,
    /// consumed by the inverse-transform division path.
    pub fn set_cyclotomic_polynomial(&self, cyclo_order: usize, modulus: &O, poly: Vec<O>) {
        let mut guard = self.inner.lock().expect("arb cache lock poisoned");
        guard
            .cyclotomic
            .insert((cyclo_order, modulus.clone()), Arc::new(poly));
    }

    pub fn cyclotomic_polynomial(
        &self,
        cyclo_order: usize,
        modulus: &O,
    ) -> Result<Arc<Vec<O>>, MathError> {
        let guard = self.inner.lock().expect("arb cache lock poisoned");
        guard
            .cyclotomic
            .get(&(cyclo_order, modulus.clone()))
            .cloned()
            .ok_or_else(|| MathError::MissingPrecompute {
                what: "cyclotomic polynomial",
                key: format!("({}, {})", cyclo_order, modulus),
            })
    }

    /// Generates the default embedding modulus and root for (order, modulus)
    /// and builds the embedding twiddle tables.
    pub fn precompute(&self, cyclo_order: usize, modulus: &O) -> Result<(O, O), MathError> {
        self.bluestein
            .precompute_default_embedding(cyclo_order, modulus)
    }

    /// Builds the embedding twiddle tables for a caller-chosen pair.
    pub fn set_embedding(
        &self,
        cyclo_order: usize,
        embedding_modulus: &O,
        embedding_root: &O,
    ) -> Result<(), MathError> {
        self.bluestein.precompute_root_tables(
            cyclo_order,
            &(embedding_modulus.clone(), embedding_root.clone()),
        )
    }

    /// Coefficient -> evaluation at the primitive m-th roots: zero-pad the
    /// dimension-n input to length m, Bluestein at the element root, keep
    /// the totient-list indices.
    pub fn forward(
        &self,
        element: &[O],
        root: &O,
        cyclo_order: usize,
        modulus: &O,
        embedding: &(O, O),
    ) -> Result<Vec<O>, MathError> {
        let m: usize = cyclo_order;
        let n: usize = totient(m);
        if element.len() != n {
            return Err(MathError::DimensionMismatch {
                expected: n,
                got: element.len(),
            });
        }
        if root.is_zero() || root.is_one() {
            return Err(MathError::InvalidRootOfUnity);
        }

        self.bluestein.ensure(m, modulus, root, embedding)?;

        let mut padded: Vec<O> = element.to_vec();
        padded.resize(m, O::default());
        let out: Vec<O> = self.bluestein.forward(&padded, root, m, modulus, embedding)?;

        Ok(totient_list(m).iter().map(|&k| out[k].clone()).collect())
    }

    /// Evaluation -> coefficient: scatter the n values onto the coprime
    /// indices of a length-m vector, Bluestein at the inverse root, scale by
    /// m^{-1}, then reduce the degree-(m-1) result mod the m-th cyclotomic
    /// polynomial.
    pub fn inverse(
        &self,
        element: &[O],
        root: &O,
        cyclo_order: usize,
        modulus: &O,
        embedding: &(O, O),
    ) -> Result<Vec<O>, MathError> {
        let m: usize = cyclo_order;
        let n: usize = totient(m);
        if element.len() != n {
            return Err(MathError::DimensionMismatch {
                expected: n,
                got: element.len(),
            });
        }
        if root.is_zero() || root.is_one() {
            return Err(MathError::InvalidRootOfUnity);
        }

        let root_inv: O = root.inv_mod(modulus)?;
        self.bluestein.ensure(m, modulus, &root_inv, embedding)?;

        let mut padded: Vec<O> = vec![O::default(); m];
        for (v, &k) in element.iter().zip(totient_list(m).iter()) {
            padded[k] = v.clone();
        }

        let mut out: Vec<O> = self
            .bluestein
            .forward(&padded, &root_inv, m, modulus, embedding)?;

        let m_inv: O = O::from_u64(m as u64).inv_mod(modulus)?;
        let red: <O as ModOps>::Reducer = O::reducer(modulus);
        for v in out.iter_mut() {
            *v = v.mul_mod(&m_inv, &red);
        }

        if n + 1 == m {
            // m prime: subtract the coefficient of x^n from all terms
            let top: O = out[n].clone();
            Ok((0..n).map(|i| out[i].sub_mod(&top, modulus)).collect())
        } else if (n + 1) * 2 == m {
            // m twice a prime: reduce mod x^(n+1)+1 first, then mod the
            // cyclotomic polynomial with alternating signs
            let mut result: Vec<O> = (0..n)
                .map(|i| out[i].sub_mod(&out[i + n + 1], modulus))
                .collect();
            let top: O = out[n].sub_mod(&out[2 * n + 1], modulus);
            for (i, v) in result.iter_mut().enumerate() {
                if i % 2 == 0 {
                    *v = v.sub_mod(&top, modulus);
                } else {
                    *v = v.add_mod(&top, modulus);
                }
            }
            Ok(result)
        } else {
            self.reduce_by_division(&out, m, n, modulus, embedding)
        }
    }

    /// Polynomial division by the cyclotomic polynomial through three NTTs
    /// in the division dimension: quotient = rev(high part) * rev(Phi)^{-1}
    /// mod x^(m-n), remainder = element - quotient * Phi.
    fn reduce_by_division(
        &self,
        element: &[O],
        m: usize,
        n: usize,
        modulus: &O,
        embedding: &(O, O),
    ) -> Result<Vec<O>, MathError> {
        let entry: Arc<DivisionEntry<O>> = self.division_entry(m, modulus, embedding)?;
        let power: usize = m - n;
        let dim: usize = entry.dim;
        let red_embedding: &<O as ModOps>::Reducer = entry.forward.reducer();

        let mut a_padded: Vec<O> = vec![O::default(); dim];
        for j in 0..power {
            a_padded[power - 1 - j] = element[n + j].clone();
        }

        let a_ntt: Vec<O> = ntt::forward_transform_iterative(&a_padded, &entry.forward)?;
        let ab: Vec<O> = izip!(a_ntt.iter(), entry.cyclo_inv_ntt.iter())
            .map(|(a, b)| a.mul_mod(b, red_embedding))
            .collect();
        let ab_coeffs: Vec<O> = ntt::inverse_transform_iterative(&ab, &entry.inverse)?;

        let mut quotient: Vec<O> = vec![O::default(); dim];
        for i in 0..power {
            quotient[i] = ab_coeffs[i].reduce(modulus);
        }

        let q_ntt: Vec<O> = ntt::forward_transform_iterative(&quotient, &entry.forward)?;
        let nq: Vec<O> = izip!(q_ntt.iter(), entry.cyclo_ntt.iter())
            .map(|(a, b)| a.mul_mod(b, red_embedding))
            .collect();
        let nq_coeffs: Vec<O> = ntt::inverse_transform_iterative(&nq, &entry.inverse)?;

        let mut result: Vec<O> = Vec::with_capacity(n);
        for i in 0..n {
            let correction: O = nq_coeffs[m - 1 - i].reduce(modulus);
            result.push(element[i].sub_mod(&correction, modulus));
        }
        Ok(result)
    }

    /// Looks up or builds the division precomputation for (order, modulus).
    /// Rebuilds when the cached entry was derived from a different embedding
    /// modulus.
    fn division_entry(
        &self,
        m: usize,
        modulus: &O,
        embedding: &(O, O),
    ) -> Result<Arc<DivisionEntry<O>>, MathError> {
        // the whole check-and-build runs under the cache lock, so a
        // concurrent first use of the same key waits for the finished entry
        let mut guard = self.inner.lock().expect("arb cache lock poisoned");

        if let Some(entry) = guard.division.get(&(m, modulus.clone())) {
            if entry.embedding_modulus == embedding.0 {
                return Ok(entry.clone());
            }
        }

        let cyclo: Arc<Vec<O>> = guard
            .cyclotomic
            .get(&(m, modulus.clone()))
            .cloned()
            .ok_or_else(|| MathError::MissingPrecompute {
                what: "cyclotomic polynomial",
                key: format!("({}, {})", m, modulus),
            })?;
        let n: usize = totient(m);
        let power: usize = m - n;
        let dim: usize = (2 * power).next_power_of_two().max(m.next_power_of_two());
        let dim_big: usize = embedding_dim(m);

        let (embedding_modulus, embedding_root) = embedding;
        let division_root: O = embedding_root.pow_mod(
            &O::from_u64((dim_big / dim) as u64),
            embedding_modulus,
        );
        let division_root_inv: O = division_root.inv_mod(embedding_modulus)?;

        let forward: TwiddleTable<O> = TwiddleTable::new(&division_root, dim, embedding_modulus);
        let inverse: TwiddleTable<O> =
            TwiddleTable::new(&division_root_inv, dim, embedding_modulus);

        let red: <O as ModOps>::Reducer = O::reducer(modulus);
        let cyclo_inv: Vec<O> = inverse_poly_mod(&cyclo, modulus, &red, power);

        let mut cyclo_inv_padded: Vec<O> = cyclo_inv;
        cyclo_inv_padded.resize(dim, O::default());
        let cyclo_inv_ntt: Vec<O> = ntt::forward_transform_iterative(&cyclo_inv_padded, &forward)?;

        let mut cyclo_padded: Vec<O> = cyclo.as_ref().clone();
        cyclo_padded.resize(dim, O::default());
        let cyclo_ntt: Vec<O> = ntt::forward_transform_iterative(&cyclo_padded, &forward)?;

        let entry: Arc<DivisionEntry<O>> = Arc::new(DivisionEntry {
            dim,
            embedding_modulus: embedding_modulus.clone(),
            forward,
            inverse,
            cyclo_ntt,
            cyclo_inv_ntt,
        });

        guard
            .division
            .insert((m, modulus.clone()), entry.clone());
        Ok(entry)
    }

    /// Clears every cached table, including the Bluestein layer.
    pub fn reset(&self) {
        {
            let mut guard = self.inner.lock().expect("arb cache lock poisoned");
            guard.cyclotomic.clear();
            guard.division.clear();
        }
        self.bluestein.reset();
    }
}

impl<O: ModOps> Default for ArbTables<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// Newton iteration for the inverse of the polynomial mod x^power:
/// h <- 2h - f h^2, doubling the valid precision every step.
/// The constant coefficient of f must be 1, which holds for every
/// cyclotomic polynomial of order > 1.
fn inverse_poly_mod<O: ModOps>(
    f: &[O],
    modulus: &O,
    red: &<O as ModOps>::Reducer,
    power: usize,
) -> Vec<O> {
    debug_assert!(f[0].is_one(), "constant coefficient must be 1");

    let rounds: usize = (usize::BITS - (power - 1).leading_zeros()) as usize;
    let mut h: Vec<O> = vec![O::from_u64(1)];

    for i in 0..rounds {
        let k: usize = 1 << (i + 1);
        let h_sq: Vec<O> = poly_mul_mod(&h, &h, modulus, red);
        let fh_sq: Vec<O> = poly_mul_mod(&h_sq, f, modulus, red);

        let mut next: Vec<O> = Vec::with_capacity(k.min(fh_sq.len()));
        for j in 0..k.min(fh_sq.len()) {
            let doubled: O = if j < h.len() {
                h[j].add_mod(&h[j], modulus)
            } else {
                O::default()
            };
            next.push(doubled.sub_mod(&fh_sq[j], modulus));
        }
        h = next;
    }

    h.resize(power, O::default());
    h
}

/// Schoolbook polynomial product with reduced coefficients; only used on
/// the short polynomials of the division precomputation.
fn poly_mul_mod<O: ModOps>(
    a: &[O],
    b: &[O],
    modulus: &O,
    red: &<O as ModOps>::Reducer,
) -> Vec<O> {
    let mut out: Vec<O> = vec![O::default(); a.len() + b.len() - 1];
    for (i, ai) in a.iter().enumerate() {
        if ai.is_zero() {
            continue;
        }
        for (j, bj) in b.iter().enumerate() {
            let t: O = ai.mul_mod(bj, red);
            out[i + j] = out[i + j].add_mod(&t, modulus);
        }
    }
    out
}

static SHARED_U64: OnceLock<ArbTables<u64>> = OnceLock::new();
static SHARED_BIG: OnceLock<ArbTables<BigUint>> = OnceLock::new();

pub(crate) fn shared_u64() -> &'static ArbTables<u64> {
    SHARED_U64.get_or_init(ArbTables::new)
}

pub(crate) fn shared_big() -> &'static ArbTables<BigUint> {
    SHARED_BIG.get_or_init(ArbTables::new)
}

/// The process-wide arbitrary-order engine for the scalar type.
pub fn shared<O: ModOps>() -> &'static ArbTables<O> {
    O::arb_tables()
}
