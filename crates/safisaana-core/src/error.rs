//! Error types for the marketplace domain.

use crate::ids::IdError;

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while building or validating domain values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Currency outside the accepted list.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// Amount that is not a positive number.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Unknown value for a configurable policy.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// A catalogue field failed validation.
    #[error("invalid {field}: {message}")]
    InvalidField {
        /// The offending field, in wire naming.
        field: &'static str,
        /// What was wrong with it.
        message: String,
    },
}

impl CoreError {
    pub(crate) fn field(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }
}
