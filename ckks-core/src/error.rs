use thiserror::Error;

/// Structured error surface for the CKKS engine.
///
/// Deep numeric routines (Barrett reduction, NTT table generation, prime
/// search) signal failure by return value; only the framing layers
/// (context construction, encode, encrypt, decrypt) convert those into
/// one of these variants.
#[derive(Debug, Error)]
pub enum CkksError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("logic error: {0}")]
    LogicError(String),

    #[error("index out of range: {0}")]
    OutOfRange(String),

    #[error("operation attempted before a valid context exists: {0}")]
    ParameterNotSet(String),

    #[error("rng/search failure: {0}")]
    RngFailure(String),
}

pub type Result<T> = std::result::Result<T, CkksError>;
