//! Error type shared by the network, its layers and neurons.
use std::io;

/// Result type for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Library error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A length, shape or parameter did not fit the receiving component.
    #[error("invalid input ({context}): {reason}")]
    InvalidInput {
        context: &'static str,
        reason: String,
    },

    /// A neuron, weight or layer lookup past the end.
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("IO error: {0}")]
    Resource(#[from] io::Error),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid(context: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            context,
            reason: reason.into(),
        }
    }

    /// Length mismatch shorthand: `got` elements where `expected` were required.
    pub(crate) fn length(context: &'static str, got: usize, expected: usize) -> Self {
        Error::invalid(context, format!("got {got} values, expected {expected}"))
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidInput { .. })
    }

    pub fn is_index_out_of_range(&self) -> bool {
        matches!(self, Error::IndexOutOfRange { .. })
    }
}
