use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("value too long: at most {max} bytes allowed, got {actual}")]
    TooLong { max: usize, actual: usize },

    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

pub type TypeResult<T> = Result<T, TypeError>;
