//! Application state management
//!
//! This module provides the shared application state that is passed
//! to all request handlers via Axum's state extraction.
//!
//! # Design Principles
//!
//! 1. **Pre-compute expensive resources**: JWT keys and the store are created once
//! 2. **Cheap cloning**: All fields use Arc or are already Clone-cheap
//! 3. **Immutable after creation**: State is read-only during request handling

use crate::auth::{JwtService, PasswordService};
use crate::config::AppConfig;
use crate::repositories::AccountStore;
use crate::services::{CredentialService, RequestContext};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Credential service holding the store, hasher and token authority
    pub credentials: CredentialService,
    /// Prometheus render handle, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new application state
    ///
    /// Derives the signing keys from the configured secret; call once at
    /// startup.
    pub fn new(store: Arc<dyn AccountStore>, config: AppConfig) -> Self {
        let jwt = JwtService::new(
            config.auth.signing_key.as_ref(),
            config.auth.token_lifetime_secs,
        );
        let passwords = PasswordService::new(config.auth.hash_algorithm, config.auth.hash_cost);
        let credentials =
            CredentialService::new(store, passwords, jwt, config.auth.credential_rules());

        Self {
            config: Arc::new(config),
            credentials,
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for the `/metrics` endpoint
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Get a reference to the configuration
    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get a reference to the JWT service
    #[inline]
    pub fn jwt(&self) -> &JwtService {
        self.credentials.tokens()
    }

    /// Fresh context for one request's credential operations
    pub fn request_context(&self) -> RequestContext {
        RequestContext::with_timeout(Duration::from_secs(
            self.config.auth.operation_timeout_secs,
        ))
    }
}
