//! Error types for primitive parsing and conversion.

use thiserror::Error;

/// Errors raised while constructing primitive values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrimitiveError {
    /// Input had the wrong length or encoding.
    #[error("invalid format: {message}")]
    InvalidFormat { message: String },

    /// A byte did not map to a known enum variant.
    #[error("invalid value {value:#04x} for {type_name}")]
    InvalidValue { type_name: &'static str, value: u8 },
}

/// Result alias for primitive operations.
pub type PrimitiveResult<T> = Result<T, PrimitiveError>;
