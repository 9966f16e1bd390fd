use crate::error::MathError;
use crate::modulus::{ModOps, WordOps};

/// Ordered powers root^0 .. root^(len-1) of a root of unity, with the
/// per-modulus Barrett constant the butterflies multiply through.
///
/// A table built for length L serves any power-of-two transform length n
/// with L = s * n; the stride s maps request indices into the larger table.
#[derive(Clone, Debug)]
pub struct TwiddleTable<O: ModOps> {
    modulus: O,
    root: O,
    reducer: O::Reducer,
    powers: Vec<O>,
}

impl<O: ModOps> TwiddleTable<O> {
    /// Builds len consecutive powers of root by chained Barrett
    /// multiplication.
    pub fn new(root: &O, len: usize, modulus: &O) -> Self {
        let reducer: O::Reducer = O::reducer(modulus);
        let mut powers: Vec<O> = Vec::with_capacity(len);
        let mut x: O = O::from_u64(1);
        for _ in 0..len {
            powers.push(x.clone());
            x = x.mul_mod(root, &reducer);
        }
        Self {
            modulus: modulus.clone(),
            root: root.clone(),
            reducer,
            powers,
        }
    }

    pub fn len(&self) -> usize {
        self.powers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.powers.is_empty()
    }

    pub fn modulus(&self) -> &O {
        &self.modulus
    }

    pub fn root(&self) -> &O {
        &self.root
    }

    pub fn reducer(&self) -> &O::Reducer {
        &self.reducer
    }

    pub fn powers(&self) -> &[O] {
        &self.powers
    }

    /// The ring-dimension factor relating this table to a request of the
    /// given length. Errors unless the table length is a multiple of it.
    pub fn stride_for(&self, len: usize) -> Result<usize, MathError> {
        if len == 0 || self.powers.len() % len != 0 {
            return Err(MathError::TableStride {
                table_len: self.powers.len(),
                len,
            });
        }
        Ok(self.powers.len() / len)
    }

    /// Whether this table can serve a transform of the given length whose
    /// twiddles are powers of the given root, i.e. the strided entry
    /// root_table^stride coincides with it.
    pub fn serves(&self, len: usize, root: &O) -> bool {
        match self.stride_for(len) {
            Ok(stride) => {
                if stride < self.powers.len() {
                    self.powers[stride] == *root
                } else {
                    // length-one request, any root acts trivially
                    len == 1
                }
            }
            Err(_) => false,
        }
    }
}

/// Iterative forward transform: bit-reversal permutation followed by
/// log2(n) Cooley-Tukey butterfly stages; stage m combines index pairs
/// (j+i, j+i+m/2) through the twiddle entry at (2*i*n/m) * stride.
///
/// The input length must be a power of two; that is a caller precondition,
/// not a handled error.
pub fn forward_transform_iterative<O: ModOps>(
    element: &[O],
    table: &TwiddleTable<O>,
) -> Result<Vec<O>, MathError> {
    let n: usize = element.len();
    assert!(
        n != 0 && n & (n - 1) == 0,
        "invalid element.len() = {}: must be a power of two",
        n
    );

    let stride: usize = table.stride_for(n)?;

    if n == 1 {
        return Ok(vec![element[0].clone()]);
    }

    let q: &O = table.modulus();
    let red: &O::Reducer = table.reducer();
    let log_n: usize = n.log2();

    let mut result: Vec<O> = Vec::with_capacity(n);
    for i in 0..n {
        result.push(element[i.reverse_bits_msb(log_n as u32)].clone());
    }

    for logm in 1..=log_n {
        let gap: usize = 1 << (1 + log_n - logm);
        let half: usize = 1 << (logm - 1);
        for j in (0..n).step_by(1 << logm) {
            for i in 0..half {
                let omega: &O = &table.powers[i * gap * stride];
                let even: usize = j + i;
                let odd: usize = even + half;

                let omega_factor: O = omega.mul_mod(&result[odd], red);
                let plus: O = result[even].add_mod(&omega_factor, q);
                let minus: O = result[even].sub_mod(&omega_factor, q);
                result[even] = plus;
                result[odd] = minus;
            }
        }
    }

    Ok(result)
}

/// Iterative inverse transform: the forward routine over the inverse-root
/// table, then scaling by n^{-1} mod q.
pub fn inverse_transform_iterative<O: ModOps>(
    element: &[O],
    inverse_table: &TwiddleTable<O>,
) -> Result<Vec<O>, MathError> {
    let n: usize = element.len();
    let mut result: Vec<O> = forward_transform_iterative(element, inverse_table)?;

    let q: &O = inverse_table.modulus();
    let n_inv: O = O::from_u64(n as u64).inv_mod(q)?;
    let red: &O::Reducer = inverse_table.reducer();
    for v in result.iter_mut() {
        *v = v.mul_mod(&n_inv, red);
    }
    Ok(result)
}
