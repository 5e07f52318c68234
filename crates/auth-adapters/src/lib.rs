//! # auth-adapters
//!
//! Bearer-token identity for StylePitch. Tokens are HS256 JWTs whose
//! `sub` claim is the user id; `iss` must match the configured issuer.

use thiserror::Error;

#[cfg(feature = "auth-jwt")]
mod jwt;

#[cfg(feature = "auth-jwt")]
pub use jwt::{Claims, JwtVerifier};

#[derive(Error, Debug)]
pub enum AuthError {
    #[cfg(feature = "auth-jwt")]
    #[error("invalid token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("token has an empty subject")]
    EmptySubject,
}

impl From<AuthError> for domains::DomainError {
    fn from(err: AuthError) -> Self {
        domains::DomainError::Unauthorized(err.to_string())
    }
}
