use thiserror::Error;

/// Errors surfaced by the transform engine and the ring types.
///
/// Every variant is unrecoverable at this layer; callers abort the enclosing
/// operation or fix their parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("cyclotomic order {0} is not a power of two")]
    NonPowerOfTwoOrder(usize),

    #[error("twiddle table of length {table_len} cannot serve a transform of length {len}")]
    TableStride { table_len: usize, len: usize },

    #[error("root of unity must not be 0 or 1")]
    InvalidRootOfUnity,

    #[error("no root of unity of order {order} exists: {order} does not divide modulus-1 for modulus {modulus}")]
    NoRootOfUnity { order: usize, modulus: String },

    #[error("root of unity search for order {order} degenerated to 1 after {retries} retries")]
    DegenerateRootOfUnity { order: usize, retries: usize },

    #[error("missing precomputation: {what} for key {key}")]
    MissingPrecompute { what: &'static str, key: String },

    #[error("operands are in different formats")]
    FormatMismatch,

    #[error("operands have mismatched ring parameters: {0}")]
    ParamsMismatch(&'static str),

    #[error("multiplication requires both operands in evaluation format")]
    MulRequiresEvaluation,

    #[error("scalar addition to the constant term requires coefficient format")]
    ScalarAddRequiresCoefficient,

    #[error("operation requires {required} format")]
    WrongFormat { required: &'static str },

    #[error("{0} has no inverse modulo {1}")]
    InverseNotExists(String, String),

    #[error("value does not fit in a native word")]
    NativeOverflow,

    #[error("vector length {got} does not match ring dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("tower list is empty")]
    EmptyTowers,

    #[error("tower counts or moduli differ between operands")]
    TowerMismatch,

    #[error("prime search exhausted: {0}")]
    PrimeSearchExhausted(&'static str),
}
