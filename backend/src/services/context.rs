//! Per-request execution context
//!
//! Carries the request's deadline into the credential service. Every
//! suspension point (store call, hash, verify) is raced against it.
//! Dropping an operation's future cancels it as well.

use crate::error::CredentialError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that never expires
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    /// Run one suspension point under the deadline
    ///
    /// Fails with `Cancelled` without starting `fut` if the deadline has
    /// already passed.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, CredentialError>
    where
        F: Future<Output = T>,
    {
        match self.deadline {
            None => Ok(fut.await),
            Some(deadline) => {
                if self.is_expired() {
                    return Err(CredentialError::Cancelled);
                }
                tokio::time::timeout_at(deadline, fut)
                    .await
                    .map_err(|_| CredentialError::Cancelled)
            }
        }
    }
}
