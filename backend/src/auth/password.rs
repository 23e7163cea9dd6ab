//! Password hashing using bcrypt or argon2
//!
//! Provides salted, adaptive-cost password hashing and verification.
//!
//! # Performance Considerations
//!
//! Both algorithms are intentionally CPU-intensive. Async callers should use
//! `hash_async` / `verify_async`, which run on the blocking thread pool.

use crate::config::HashAlgorithm;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

/// bcrypt only consumes this many bytes of input
pub const BCRYPT_MAX_PASSWORD_BYTES: usize = 72;

/// Password hashing failures
///
/// A wrong password is never an error; it is `Ok(false)` from `verify`.
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to hash password: {0}")]
    Hash(String),

    #[error("Password exceeds {max} bytes")]
    PasswordTooLong { max: usize },

    #[error("Stored hash is not well-formed: {0}")]
    MalformedHash(String),

    #[error("Hashing task failed: {0}")]
    Task(String),
}

/// Password hashing service
///
/// Holds the algorithm and cost chosen at startup. Verification dispatches
/// on the stored hash's prefix, so hashes written under a previously
/// configured algorithm keep verifying.
#[derive(Debug, Clone, Copy)]
pub struct PasswordService {
    algorithm: HashAlgorithm,
    cost: u32,
}

impl PasswordService {
    pub fn new(algorithm: HashAlgorithm, cost: u32) -> Self {
        Self { algorithm, cost }
    }

    /// Hash a password (blocking operation)
    pub fn hash(&self, password: &str) -> Result<String, HashError> {
        match self.algorithm {
            HashAlgorithm::Bcrypt => {
                // bcrypt would silently drop everything past the limit
                if password.len() > BCRYPT_MAX_PASSWORD_BYTES {
                    return Err(HashError::PasswordTooLong {
                        max: BCRYPT_MAX_PASSWORD_BYTES,
                    });
                }
                bcrypt::hash(password, self.cost).map_err(|e| HashError::Hash(e.to_string()))
            }
            HashAlgorithm::Argon2 => {
                let salt = SaltString::generate(&mut OsRng);
                Argon2::default()
                    .hash_password(password.as_bytes(), &salt)
                    .map(|hash| hash.to_string())
                    .map_err(|e| HashError::Hash(e.to_string()))
            }
        }
    }

    /// Hash a password asynchronously (non-blocking)
    pub async fn hash_async(&self, password: String) -> Result<String, HashError> {
        let service = *self;
        tokio::task::spawn_blocking(move || service.hash(&password))
            .await
            .map_err(|e| HashError::Task(e.to_string()))?
    }

    /// Verify a password against a stored hash (blocking operation)
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, HashError> {
        if is_bcrypt_hash(hash) {
            // No stored bcrypt hash can match input bcrypt would truncate
            if password.len() > BCRYPT_MAX_PASSWORD_BYTES {
                return Ok(false);
            }
            return bcrypt::verify(password, hash)
                .map_err(|e| HashError::MalformedHash(e.to_string()));
        }
        if hash.starts_with("$argon2") {
            let parsed_hash =
                PasswordHash::new(hash).map_err(|e| HashError::MalformedHash(e.to_string()))?;
            return Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok());
        }
        Err(HashError::MalformedHash("unrecognized hash format".to_string()))
    }

    /// Verify a password asynchronously (non-blocking)
    pub async fn verify_async(&self, password: String, hash: String) -> Result<bool, HashError> {
        let service = *self;
        tokio::task::spawn_blocking(move || service.verify(&password, &hash))
            .await
            .map_err(|e| HashError::Task(e.to_string()))?
    }
}

fn is_bcrypt_hash(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2x$", "$2y$"]
        .iter()
        .any(|prefix| hash.starts_with(prefix))
}
