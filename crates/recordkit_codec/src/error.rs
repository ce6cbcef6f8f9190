//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding, decoding or converting values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Float values cannot be stored in a record.
    #[error("float values are not supported in records")]
    FloatForbidden,

    /// Indefinite-length items are forbidden.
    #[error("indefinite-length items are forbidden")]
    IndefiniteLengthForbidden,

    /// Invalid UTF-8 string.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// Input ended in the middle of an item.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Input was structurally valid CBOR but not in canonical form,
    /// or not CBOR at all.
    #[error("invalid CBOR structure: {message}")]
    InvalidStructure {
        /// What was wrong.
        message: String,
    },

    /// Integer does not fit the record integer range.
    #[error("integer out of range")]
    IntegerOverflow,

    /// Declared length exceeds the decoder limit.
    #[error("declared length {claimed} exceeds limit {limit}")]
    SizeLimitExceeded {
        /// Length claimed by the input.
        claimed: u64,
        /// Largest accepted length.
        limit: u64,
    },

    /// A typed value could not be converted to or from a record.
    #[error("serde conversion failed: {message}")]
    Serde {
        /// Message reported by serde.
        message: String,
    },
}

impl CodecError {
    /// Creates an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    /// Creates a serde conversion error.
    pub fn serde(message: impl std::fmt::Display) -> Self {
        Self::Serde {
            message: message.to_string(),
        }
    }
}
