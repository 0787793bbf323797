use thiserror::Error;

/// Every way a step, an exchange or a peer payload can be refused.
///
/// None of these are retried internally: validation failures are a pure function of the
/// input, only `RandomnessUnavailable` depends on the environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// An array does not have the length fixed by the protocol version.
    #[error("shape mismatch on `{field}`: expected {expected} entries, got {actual}")]
    ShapeMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A game cell carries a value outside of the configured bounds.
    #[error("cell {index} out of bounds: `{field}` = {value} exceeds {max}")]
    CellOutOfBounds {
        index: usize,
        field: &'static str,
        value: u64,
        max: u64,
    },

    /// An action slot does not follow the action encoding.
    #[error("action {index} is malformed: {reason}")]
    MalformedAction { index: usize, reason: String },

    /// A bit-like vector holds something other than 0 or 1.
    #[error("`{field}[{index}]` must be 0 or 1, got {value}")]
    NotABit {
        field: &'static str,
        index: usize,
        value: u64,
    },

    /// Captures were declared without an authorizing action.
    #[error("capture authorization violated: villages {villages:?} lack an authorizing action")]
    CaptureAuthorizationViolation { villages: Vec<usize> },

    /// A blinding exponent shares a factor with the curve order.
    #[error("{value} is not invertible modulo {modulus}")]
    NotInvertible { value: String, modulus: String },

    /// The random source failed to produce bytes.
    #[error("randomness unavailable: {0}")]
    RandomnessUnavailable(String),

    /// An integer does not fit in a fixed-width bit encoding.
    #[error("value does not fit in {width} bits")]
    ValueTooWide { width: usize },

    /// An integer is not reduced modulo the expected modulus.
    #[error("{value} is not a canonical element modulo {modulus}")]
    NonCanonical { value: String, modulus: String },

    /// Coordinates that do not satisfy the curve equation.
    #[error("point ({x}, {y}) is not on the curve")]
    NotOnCurve { x: String, y: String },

    /// A curve point with a component outside of the prime-order subgroup.
    #[error("point ({x}, {y}) is not in the prime-order subgroup")]
    NotInSubgroup { x: String, y: String },

    /// Content received from the peer could not be decoded.
    #[error("malformed peer data: {0}")]
    MalformedPeerData(String),

    /// A step does not extend the current head of the chain.
    #[error("step folds onto {actual}, chain head is {expected}")]
    ChainMismatch { expected: String, actual: String },

    /// The game-rule collaborator refused the batch.
    #[error("game rules rejected the batch: {0}")]
    RuleRejected(String),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/**
 * Check the length of an array against the value fixed by the protocol
 *
 * @param field - name of the array, reported on failure
 * @param expected - required length
 * @param actual - observed length
 * @return - ShapeMismatch if lengths differ
 */
pub fn expect_len(field: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(ProtocolError::ShapeMismatch {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}
