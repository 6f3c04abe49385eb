//! Protocol error types.

use thiserror::Error;

/// Errors raised while converting values or decoding rowsets.
#[derive(Debug, Error)]
pub enum Error {
    /// A value had a different type than the property expects.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// An integer did not fit the property type.
    #[error("value {value} out of range for {target}")]
    OutOfRange { target: &'static str, value: String },

    /// Rowset columns had differing lengths.
    #[error("column {column} has {actual} values, expected {expected}")]
    RaggedRowset {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}
