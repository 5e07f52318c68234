//! # DomainError
//!
//! Centralized error type shared by every StylePitch layer.
//! Adapters translate their infrastructure failures into one of these
//! variants; the HTTP layer maps each variant onto a status code.

use thiserror::Error;

/// The primary error type for all domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Resource not found (e.g., Design, User, Chat)
    #[error("{entity} not found with ID {id}")]
    NotFound { entity: &'static str, id: String },

    /// Validation failure (e.g., empty title, unknown region)
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or invalid credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to touch this resource
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource already exists
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g., DB down, pool exhausted)
    #[error("storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}

/// A specialized Result type for StylePitch logic.
pub type Result<T> = std::result::Result<T, DomainError>;
