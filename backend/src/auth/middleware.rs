//! Authentication middleware
//!
//! The request gate: extracts the bearer token, validates it, and attaches
//! the resolved identity to the request. It never consults the account
//! store, so a token stays usable for its whole lifetime even if the account
//! changes afterwards.

use crate::auth::JwtService;
use crate::error::{ApiError, CredentialError};
use crate::state::AppState;
use axum::{
    extract::{FromRef, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

const BEARER_PREFIX: &str = "Bearer ";

/// Authenticated identity resolved from a validated token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub account_id: Uuid,
    pub email: String,
}

/// Authenticate a raw `Authorization` header value at `now`
///
/// Every failure is `CredentialError::Unauthenticated`; the token subtype is
/// only logged.
pub fn authenticate(
    authorization: Option<&str>,
    tokens: &JwtService,
    now: DateTime<Utc>,
) -> Result<AuthUser, CredentialError> {
    let header = authorization
        .filter(|value| !value.is_empty())
        .ok_or(CredentialError::Unauthenticated("missing credential"))?;

    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(CredentialError::Unauthenticated("malformed credential"))?;

    let claims = tokens.validate(token, now).map_err(|e| {
        debug!(reason = %e, "Rejected bearer token");
        CredentialError::Unauthenticated("invalid or expired credential")
    })?;

    Ok(AuthUser {
        account_id: claims.sub,
        email: claims.email,
    })
}

fn authenticate_headers(headers: &HeaderMap, tokens: &JwtService) -> Result<AuthUser, ApiError> {
    // A header that is not visible ASCII counts as absent.
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    authenticate(authorization, tokens, Utc::now()).map_err(|e| {
        metrics::counter!("auth_gate_rejections_total").increment(1);
        ApiError::from(e)
    })
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already resolved by `require_auth` on this request
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let app_state = AppState::from_ref(state);
        authenticate_headers(&parts.headers, app_state.jwt())
    }
}

/// Middleware that gates a group of routes
///
/// Apply with `axum::middleware::from_fn_with_state(state, require_auth)`.
/// The identity is inserted into request extensions for downstream handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate_headers(request.headers(), state.jwt())?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
