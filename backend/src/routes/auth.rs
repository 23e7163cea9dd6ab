//! Authentication routes
//!
//! Provides endpoints for signup, signin and the current account.

use crate::auth::{require_auth, AuthUser};
use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use pomodeep_shared::{AccountView, CreateUserRequest, CreateUserResponse, SignInRequest, SignInResponse};

/// Create auth routes
///
/// `/me` sits behind the `require_auth` gate.
pub fn auth_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(current_account))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/signup", post(sign_up))
        .route("/signin", post(sign_in))
        .merge(protected)
}

/// Register a new account
///
/// POST /api/v1/auth/signup
async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateUserResponse>)> {
    let Json(req) = payload?;
    let ctx = state.request_context();
    let response = state.credentials.sign_up(&ctx, &req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Sign in with email and password
///
/// POST /api/v1/auth/signin
async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> ApiResult<Json<SignInResponse>> {
    let Json(req) = payload?;
    let ctx = state.request_context();
    let response = state.credentials.sign_in(&ctx, &req).await?;
    Ok(Json(response))
}

/// Get the current account (requires authentication)
///
/// GET /api/v1/auth/me
async fn current_account(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<AccountView>> {
    let ctx = state.request_context();
    let account = state.credentials.current_account(&ctx, &auth_user).await?;
    Ok(Json(account))
}
