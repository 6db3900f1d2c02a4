//! Error types for the catalog sync engine.

use thiserror::Error;

/// All possible errors from the engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Field table validation
    #[error("missing required field: {0}")]
    MissingRequiredField(String),

    #[error("type mismatch for field '{field}': expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: String,
        got: String,
    },

    #[error("field not in table v{version}: {field}")]
    UnknownField { field: String, version: u32 },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    // Ingress
    #[error("invalid change signal: {0}")]
    InvalidSignal(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
