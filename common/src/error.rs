use std::string::FromUtf8Error;

use thiserror::Error;

/// Conditions the pipeline classifies.
///
/// `MalformedInput` and `MalformedValue` fail a single record or key,
/// `ArithmeticOverflow` fails a single key, and `ContractViolation`
/// invalidates the whole run.
#[derive(Debug, Error)]
pub enum MapReduceError {
    #[error("record is not valid UTF-8: {0}")]
    MalformedInput(#[from] FromUtf8Error),

    #[error("value is not an encoded count ({len} bytes)")]
    MalformedValue { len: usize },

    #[error("count for key `{key}` overflowed")]
    ArithmeticOverflow { key: String },

    #[error("grouping contract violated: {0}")]
    ContractViolation(String),
}

impl MapReduceError {
    /// Whether this error invalidates every result of the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MapReduceError::ContractViolation(_))
    }
}
