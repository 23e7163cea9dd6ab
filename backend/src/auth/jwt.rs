//! JWT token issuance and validation
//!
//! Tokens are HS256-signed and carry the account id and email. Keys are
//! derived once from the configured secret and shared behind `Arc`.
//!
//! Time checks are made against a caller-supplied `now` rather than the
//! system clock, so validity windows are testable and the decision for a
//! request is made at one instant.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Well-known signing key used when none is configured. Insecure.
pub const DEVELOPMENT_SIGNING_KEY: &str = "your-secret-key-change-in-production";

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID)
    pub sub: Uuid,
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Not before (Unix timestamp)
    pub nbf: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Token failures
///
/// The subtypes exist for diagnostics; the request gate collapses them into
/// a single unauthenticated outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token is not yet valid")]
    NotYetValid,

    #[error("failed to sign token: {0}")]
    Encoding(String),
}

/// Pre-computed JWT keys for efficient token operations
#[derive(Clone)]
pub struct JwtKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl JwtKeys {
    /// Create new JWT keys from secret
    /// This should be called once at startup
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret)),
            decoding: Arc::new(DecodingKey::from_secret(secret)),
        }
    }
}

/// JWT service for token operations
#[derive(Clone)]
pub struct JwtService {
    keys: JwtKeys,
    lifetime_secs: i64,
    validation: Arc<Validation>,
    uses_development_key: bool,
}

impl JwtService {
    /// Create a JWT service from the configured key
    ///
    /// Falls back to `DEVELOPMENT_SIGNING_KEY` when `secret` is `None`, and
    /// says so loudly.
    pub fn new(secret: Option<&SecretString>, lifetime_secs: i64) -> Self {
        let (secret, uses_development_key) = match secret {
            Some(secret) if !secret.expose_secret().is_empty() => {
                (secret.expose_secret().as_bytes(), false)
            }
            _ => {
                warn!(
                    "No token signing key configured; using the insecure development key. \
                     Set POMODEEP__AUTH__SIGNING_KEY or JWT_SECRET before deploying."
                );
                (DEVELOPMENT_SIGNING_KEY.as_bytes(), true)
            }
        };

        // Signature and algorithm only; the time window is checked against
        // the caller's `now` in `validate`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims.clear();

        Self {
            keys: JwtKeys::new(secret),
            lifetime_secs,
            validation: Arc::new(validation),
            uses_development_key,
        }
    }

    /// Issue a token for an account
    pub fn issue(
        &self,
        account_id: Uuid,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let expires_at = Duration::try_seconds(self.lifetime_secs)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                TokenError::Encoding(format!(
                    "token lifetime of {}s is out of range",
                    self.lifetime_secs
                ))
            })?;

        let claims = Claims {
            sub: account_id,
            email: email.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Validate a token at `now` and return its claims
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.keys.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::BadSignature
                }
                _ => TokenError::Malformed,
            })?
            .claims;

        let now = now.timestamp();
        if now < claims.nbf {
            return Err(TokenError::NotYetValid);
        }
        if now > claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Whether the insecure fallback key is in use
    #[inline]
    pub fn uses_development_key(&self) -> bool {
        self.uses_development_key
    }
}
