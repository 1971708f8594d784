//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Outcomes decided from the input alone. Uniqueness, references and storage
/// failures need the store and live in the infra layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input failed validation (empty/duplicate-shaped name, unknown atom,
    /// unknown portal). Recoverable by correcting the input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation is never allowed for this target (system role mutation,
    /// portal mismatch). Not retryable.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
