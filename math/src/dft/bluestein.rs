use std::sync::{Arc, Mutex};

use utils::map::Map;

use crate::dft::ntt::{self, TwiddleTable};
use crate::error::MathError;
use crate::modulus::{ModOps, WordOps};
use crate::nbtheory::{first_prime, root_of_unity};

/// Embedding transform length for a length-m Bluestein convolution.
pub fn embedding_dim(m: usize) -> usize {
    (2 * m - 1).next_power_of_two()
}

struct BluesteinInner<O: ModOps> {
    /// (embedding modulus, embedding root) -> (forward, inverse) tables.
    root_tables: Map<(O, O), Arc<(TwiddleTable<O>, TwiddleTable<O>)>>,
    /// (ring modulus, ring root) -> chirp table root^(i^2 mod 2m).
    powers: Map<(O, O), Arc<Vec<O>>>,
    /// ((ring modulus, ring root), embedding pair) -> NTT image of the
    /// reversed chirp.
    rb: Map<((O, O), (O, O)), Arc<Vec<O>>>,
    /// ring modulus -> default embedding pair.
    default_embedding: Map<O, (O, O)>,
}

/// Per-(modulus, root) Bluestein precomputations.
///
/// The transform path only reads; every table consumed by forward() must
/// have been built beforehand, or the call fails with a missing-key error.
pub struct BluesteinTables<O: ModOps> {
    inner: Mutex<BluesteinInner<O>>,
    build: Mutex<()>,
}

impl<O: ModOps> BluesteinTables<O> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BluesteinInner {
                root_tables: Map::new(),
                powers: Map::new(),
                rb: Map::new(),
                default_embedding: Map::new(),
            }),
            build: Mutex::new(()),
        }
    }

    /// Generates and stores the default embedding modulus and root for the
    /// ring modulus: the first prime large enough to carry the exact
    /// convolution, congruent to 1 mod twice the embedding length, and a
    /// (2 * embedding length)-th root of unity for it.
    pub fn precompute_default_embedding(
        &self,
        cyclo_order: usize,
        modulus: &O,
    ) -> Result<(O, O), MathError> {
        let dim: usize = embedding_dim(cyclo_order);
        let bits: u64 = dim.log2() as u64 + 2 * modulus.bits();
        let embedding_modulus: O = O::from_biguint(&first_prime(bits, 2 * dim as u64)?)
            .ok_or(MathError::NativeOverflow)?;
        let embedding_root: O = root_of_unity(2 * dim, &embedding_modulus)?;
        let pair: (O, O) = (embedding_modulus, embedding_root);

        {
            let mut guard = self.inner.lock().expect("bluestein cache lock poisoned");
            guard
                .default_embedding
                .insert(modulus.clone(), pair.clone());
        }
        self.precompute_root_tables(cyclo_order, &pair)?;
        Ok(pair)
    }

    pub fn default_embedding(&self, modulus: &O) -> Option<(O, O)> {
        self.inner
            .lock()
            .expect("bluestein cache lock poisoned")
            .default_embedding
            .get(modulus)
            .cloned()
    }

    /// Builds the forward and inverse twiddle tables of the embedding
    /// transform for the given pair.
    pub fn precompute_root_tables(
        &self,
        cyclo_order: usize,
        embedding: &(O, O),
    ) -> Result<(), MathError> {
        let dim: usize = embedding_dim(cyclo_order);
        let (embedding_modulus, embedding_root) = embedding;
        let root_inv: O = embedding_root.inv_mod(embedding_modulus)?;

        let tables: Arc<(TwiddleTable<O>, TwiddleTable<O>)> = Arc::new((
            TwiddleTable::new(embedding_root, dim, embedding_modulus),
            TwiddleTable::new(&root_inv, dim, embedding_modulus),
        ));

        let mut guard = self.inner.lock().expect("bluestein cache lock poisoned");
        guard.root_tables.insert(embedding.clone(), tables);
        Ok(())
    }

    /// Builds the chirp table root^(i^2 mod 2m) for (modulus, root).
    pub fn precompute_powers(
        &self,
        cyclo_order: usize,
        modulus: &O,
        root: &O,
    ) -> Result<(), MathError> {
        let m: usize = cyclo_order;
        let mut powers: Vec<O> = Vec::with_capacity(m);
        powers.push(O::from_u64(1));
        for i in 1..m {
            let i_sqr: u64 = ((i * i) % (2 * m)) as u64;
            powers.push(root.pow_mod(&O::from_u64(i_sqr), modulus));
        }

        let mut guard = self.inner.lock().expect("bluestein cache lock poisoned");
        guard
            .powers
            .insert((modulus.clone(), root.clone()), Arc::new(powers));
        Ok(())
    }

    /// Builds the embedding-NTT image of the reversed chirp for
    /// ((modulus, root), embedding pair). The embedding root tables must
    /// exist already.
    pub fn precompute_rb(
        &self,
        cyclo_order: usize,
        modulus: &O,
        root: &O,
        embedding: &(O, O),
    ) -> Result<(), MathError> {
        let m: usize = cyclo_order;
        let dim: usize = embedding_dim(m);

        let tables: Arc<(TwiddleTable<O>, TwiddleTable<O>)> = {
            let guard = self.inner.lock().expect("bluestein cache lock poisoned");
            guard
                .root_tables
                .get(embedding)
                .cloned()
                .ok_or_else(|| MathError::MissingPrecompute {
                    what: "bluestein embedding root tables",
                    key: format!("({}, {})", embedding.0, embedding.1),
                })?
        };

        let root_inv: O = root.inv_mod(modulus)?;
        let mut b: Vec<O> = vec![O::default(); dim];
        b[m - 1] = O::from_u64(1);
        for i in 1..m {
            let i_sqr: u64 = ((i * i) % (2 * m)) as u64;
            let val: O = root_inv.pow_mod(&O::from_u64(i_sqr), modulus);
            b[m - 1 + i] = val.clone();
            b[m - 1 - i] = val;
        }

        let rb: Vec<O> = ntt::forward_transform_iterative(&b, &tables.0)?;

        let mut guard = self.inner.lock().expect("bluestein cache lock poisoned");
        guard.rb.insert(
            ((modulus.clone(), root.clone()), embedding.clone()),
            Arc::new(rb),
        );
        Ok(())
    }

    /// Builds whatever of the three table kinds is missing for
    /// ((modulus, root), embedding pair). The whole check-and-build sequence
    /// holds the build lock, so concurrent first use of a key serializes
    /// instead of racing a half-built table.
    pub fn ensure(
        &self,
        cyclo_order: usize,
        modulus: &O,
        root: &O,
        embedding: &(O, O),
    ) -> Result<(), MathError> {
        let _build = self.build.lock().expect("bluestein build lock poisoned");
        let (have_tables, have_powers, have_rb) = {
            let guard = self.inner.lock().expect("bluestein cache lock poisoned");
            (
                guard.root_tables.contains(embedding),
                guard.powers.contains(&(modulus.clone(), root.clone())),
                guard
                    .rb
                    .contains(&((modulus.clone(), root.clone()), embedding.clone())),
            )
        };
        if !have_tables {
            self.precompute_root_tables(cyclo_order, embedding)?;
        }
        if !have_powers {
            self.precompute_powers(cyclo_order, modulus, root)?;
        }
        if !have_rb {
            self.precompute_rb(cyclo_order, modulus, root, embedding)?;
        }
        Ok(())
    }

    /// Length-m transform at the given root via chirp multiplication and an
    /// embedding-NTT convolution against the reversed chirp.
    pub fn forward(
        &self,
        element: &[O],
        root: &O,
        cyclo_order: usize,
        modulus: &O,
        embedding: &(O, O),
    ) -> Result<Vec<O>, MathError> {
        let m: usize = cyclo_order;
        if element.len() != m {
            return Err(MathError::DimensionMismatch {
                expected: m,
                got: element.len(),
            });
        }
        let dim: usize = embedding_dim(m);

        let (tables, powers, rb) = {
            let guard = self.inner.lock().expect("bluestein cache lock poisoned");
            let tables = guard
                .root_tables
                .get(embedding)
                .cloned()
                .ok_or_else(|| MathError::MissingPrecompute {
                    what: "bluestein embedding root tables",
                    key: format!("({}, {})", embedding.0, embedding.1),
                })?;
            let powers = guard
                .powers
                .get(&(modulus.clone(), root.clone()))
                .cloned()
                .ok_or_else(|| MathError::MissingPrecompute {
                    what: "bluestein chirp powers",
                    key: format!("({}, {})", modulus, root),
                })?;
            let rb = guard
                .rb
                .get(&((modulus.clone(), root.clone()), embedding.clone()))
                .cloned()
                .ok_or_else(|| MathError::MissingPrecompute {
                    what: "bluestein reversed-chirp table",
                    key: format!("(({}, {}), ({}, {}))", modulus, root, embedding.0, embedding.1),
                })?;
            (tables, powers, rb)
        };

        let red: <O as ModOps>::Reducer = O::reducer(modulus);
        let red_embedding: &<O as ModOps>::Reducer = tables.0.reducer();

        // chirp-multiply and zero-pad into the embedding length
        let mut ra: Vec<O> = Vec::with_capacity(dim);
        for (v, p) in element.iter().zip(powers.iter()) {
            ra.push(v.mul_mod(p, &red));
        }
        ra.resize(dim, O::default());

        let ra_ntt: Vec<O> = ntt::forward_transform_iterative(&ra, &tables.0)?;
        let rc_ntt: Vec<O> = ra_ntt
            .iter()
            .zip(rb.iter())
            .map(|(a, b)| a.mul_mod(b, red_embedding))
            .collect();
        let rc: Vec<O> = ntt::inverse_transform_iterative(&rc_ntt, &tables.1)?;

        // the middle m entries hold the convolution; fold them back into the
        // ring modulus and chirp-multiply again
        let mut out: Vec<O> = Vec::with_capacity(m);
        for i in 0..m {
            let folded: O = rc[m - 1 + i].reduce(modulus);
            out.push(folded.mul_mod(&powers[i], &red));
        }
        Ok(out)
    }

    /// Clears every cached table.
    pub fn reset(&self) {
        let mut guard = self.inner.lock().expect("bluestein cache lock poisoned");
        guard.root_tables.clear();
        guard.powers.clear();
        guard.rb.clear();
        guard.default_embedding.clear();
    }
}

impl<O: ModOps> Default for BluesteinTables<O> {
    fn default() -> Self {
        Self::new()
    }
}
