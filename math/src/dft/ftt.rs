use std::sync::{Arc, Mutex, OnceLock};

use num_bigint::BigUint;
use num_traits::{One, Zero};
use utils::map::Map;

use crate::dft::ntt::{self, TwiddleTable};
use crate::error::MathError;
use crate::modulus::ModOps;
use crate::nbtheory::is_power_of_two;

/// Forward and inverse twiddle tables for one modulus, built from one root.
#[derive(Clone, Debug)]
pub struct FttEntry<O: ModOps> {
    pub forward: TwiddleTable<O>,
    pub inverse: TwiddleTable<O>,
}

/// Per-modulus cache of power-of-two twiddle tables.
///
/// Every check-and-build runs under the interior lock, so concurrent first
/// use of a modulus serializes; built entries are shared out as Arcs and
/// read lock-free. A lookup whose root disagrees with the cached entry
/// rebuilds it (last writer wins).
pub struct FttTables<O: ModOps> {
    entries: Mutex<Map<O, Arc<FttEntry<O>>>>,
}

impl<O: ModOps> FttTables<O> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Map::new()),
        }
    }

    /// Eagerly builds the tables for (root, order, modulus).
    pub fn precompute(&self, root: &O, cyclo_order: usize, modulus: &O) -> Result<(), MathError> {
        if !is_power_of_two(cyclo_order) {
            return Err(MathError::NonPowerOfTwoOrder(cyclo_order));
        }
        if root.is_zero() || root.is_one() {
            return Err(MathError::InvalidRootOfUnity);
        }
        self.lookup_or_build(root, cyclo_order, modulus).map(|_| ())
    }

    /// Precomputes a chain of (root, modulus) pairs sharing one order, as a
    /// tower decomposition does before fanning out per-tower work.
    pub fn precompute_chain(
        &self,
        roots: &[O],
        cyclo_order: usize,
        moduli: &[O],
    ) -> Result<(), MathError> {
        if roots.len() != moduli.len() {
            return Err(MathError::ParamsMismatch(
                "root and modulus chains differ in length",
            ));
        }
        for (root, modulus) in roots.iter().zip(moduli.iter()) {
            self.precompute(root, cyclo_order, modulus)?;
        }
        Ok(())
    }

    /// Clears every cached table.
    pub fn reset(&self) {
        self.entries.lock().expect("ftt cache lock poisoned").clear();
    }

    fn lookup_or_build(
        &self,
        root: &O,
        cyclo_order: usize,
        modulus: &O,
    ) -> Result<Arc<FttEntry<O>>, MathError> {
        let n: usize = cyclo_order / 2;
        let mut guard = self.entries.lock().expect("ftt cache lock poisoned");

        if let Some(entry) = guard.get(modulus) {
            if entry.forward.serves(n, root) {
                return Ok(entry.clone());
            }
        }

        let root_inv: O = root.inv_mod(modulus)?;
        let entry: Arc<FttEntry<O>> = Arc::new(FttEntry {
            forward: TwiddleTable::new(root, n, modulus),
            inverse: TwiddleTable::new(&root_inv, n, modulus),
        });
        guard.insert(modulus.clone(), entry.clone());
        Ok(entry)
    }

    /// Coefficient -> evaluation for a power-of-two cyclotomic order:
    /// twist coefficient i by root^i, then run the half-length forward NTT.
    pub fn forward(
        &self,
        element: &[O],
        root: &O,
        cyclo_order: usize,
        modulus: &O,
    ) -> Result<Vec<O>, MathError> {
        if !is_power_of_two(cyclo_order) {
            return Err(MathError::NonPowerOfTwoOrder(cyclo_order));
        }
        if root.is_zero() || root.is_one() {
            return Err(MathError::InvalidRootOfUnity);
        }
        let n: usize = cyclo_order / 2;
        if element.len() != n {
            return Err(MathError::DimensionMismatch {
                expected: n,
                got: element.len(),
            });
        }

        let entry: Arc<FttEntry<O>> = self.lookup_or_build(root, cyclo_order, modulus)?;
        let stride: usize = entry.forward.stride_for(n)?;
        let red: &<O as ModOps>::Reducer = entry.forward.reducer();

        let mut twisted: Vec<O> = Vec::with_capacity(n);
        for (i, v) in element.iter().enumerate() {
            twisted.push(v.mul_mod(&entry.forward.powers()[i * stride], red));
        }

        ntt::forward_transform_iterative(&twisted, &entry.forward)
    }

    /// Evaluation -> coefficient: inverse NTT, then untwist coefficient i
    /// by root^(-i).
    pub fn inverse(
        &self,
        element: &[O],
        root: &O,
        cyclo_order: usize,
        modulus: &O,
    ) -> Result<Vec<O>, MathError> {
        if !is_power_of_two(cyclo_order) {
            return Err(MathError::NonPowerOfTwoOrder(cyclo_order));
        }
        if root.is_zero() || root.is_one() {
            return Err(MathError::InvalidRootOfUnity);
        }
        let n: usize = cyclo_order / 2;
        if element.len() != n {
            return Err(MathError::DimensionMismatch {
                expected: n,
                got: element.len(),
            });
        }

        let entry: Arc<FttEntry<O>> = self.lookup_or_build(root, cyclo_order, modulus)?;
        let stride: usize = entry.inverse.stride_for(n)?;
        let red: &<O as ModOps>::Reducer = entry.inverse.reducer();

        let mut result: Vec<O> = ntt::inverse_transform_iterative(element, &entry.inverse)?;
        for (i, v) in result.iter_mut().enumerate() {
            *v = v.mul_mod(&entry.inverse.powers()[i * stride], red);
        }
        Ok(result)
    }
}

impl<O: ModOps> Default for FttTables<O> {
    fn default() -> Self {
        Self::new()
    }
}

static SHARED_U64: OnceLock<FttTables<u64>> = OnceLock::new();
static SHARED_BIG: OnceLock<FttTables<BigUint>> = OnceLock::new();

pub(crate) fn shared_u64() -> &'static FttTables<u64> {
    SHARED_U64.get_or_init(FttTables::new)
}

pub(crate) fn shared_big() -> &'static FttTables<BigUint> {
    SHARED_BIG.get_or_init(FttTables::new)
}

/// The process-wide table cache for the scalar type.
pub fn shared<O: ModOps>() -> &'static FttTables<O> {
    O::ftt_tables()
}
