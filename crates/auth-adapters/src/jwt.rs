use std::time::Duration;

use chrono::Utc;
use domains::{IdentityVerifier, Result, UserId};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::AuthError;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct JwtVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl: Duration,
}

impl JwtVerifier {
    pub fn new(secret: &SecretString, issuer: impl Into<String>, ttl: Duration) -> Self {
        let issuer = issuer.into();
        let key = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            validation,
            issuer,
            ttl,
        }
    }

    /// Mints a token for `user` valid for the configured TTL.
    pub fn issue(&self, user: &UserId) -> std::result::Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.as_str().to_string(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
        };
        self.encode(&claims)
    }

    pub fn encode(&self, claims: &Claims) -> std::result::Result<String, AuthError> {
        Ok(encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding_key,
        )?)
    }

    pub fn decode(&self, token: &str) -> std::result::Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        if data.claims.sub.trim().is_empty() {
            return Err(AuthError::EmptySubject);
        }
        Ok(data.claims)
    }
}

impl IdentityVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<UserId> {
        let claims = self.decode(token).inspect_err(|err| {
            debug!(error = %err, "rejected bearer token");
        })?;
        Ok(UserId::new(claims.sub))
    }
}
