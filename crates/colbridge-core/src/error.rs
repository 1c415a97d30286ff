use crate::driver::DriverError;
use crate::types::{SemanticType, TypeParseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("unsupported type: {semantic_type}")]
    UnsupportedType { semantic_type: SemanticType },

    #[error("unsupported type {semantic_type} for column {column}")]
    UnsupportedColumnType {
        column: String,
        semantic_type: SemanticType,
    },

    #[error("schema mismatch: expected {expected} columns, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("value {value} cannot be represented exactly as {semantic_type}")]
    PrecisionOverflow {
        semantic_type: SemanticType,
        value: String,
    },

    /// The `unknown` type observed a non-null value from the driver.
    #[error("expected a null value, but got {value}")]
    ExpectedNull { value: String },

    #[error("invalid {semantic_type} value: {reason}")]
    InvalidValue {
        semantic_type: SemanticType,
        reason: String,
    },

    #[error(transparent)]
    TypeParse(#[from] TypeParseError),

    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}

impl BridgeError {
    pub(crate) fn unsupported(semantic_type: &SemanticType) -> Self {
        BridgeError::UnsupportedType {
            semantic_type: semantic_type.clone(),
        }
    }

    pub(crate) fn invalid(semantic_type: &SemanticType, reason: impl Into<String>) -> Self {
        BridgeError::InvalidValue {
            semantic_type: semantic_type.clone(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
