//! Application error handling
//!
//! `CredentialError` is the core's outcome taxonomy; every dependency
//! failure is classified into it before leaving a service. `ApiError`
//! converts it into an HTTP response.

use crate::auth::{HashError, TokenError};
use crate::repositories::StoreError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pomodeep_shared::{ErrorDetail, ErrorKind, ErrorResponse};
use thiserror::Error;
use tracing::{debug, error};

/// Credential core errors
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("User with this email already exists")]
    DuplicateAccount,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Unauthenticated: {0}")]
    Unauthenticated(&'static str),

    #[error("Account not found")]
    NotFound,

    #[error("Account store failure")]
    Store(#[source] StoreError),

    #[error("Password hashing failure")]
    Hashing(#[source] HashError),

    #[error("Token signing failure")]
    Token(#[source] TokenError),

    #[error("Operation cancelled before completion")]
    Cancelled,
}

impl CredentialError {
    /// The wire-level kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CredentialError::InvalidInput(_) => ErrorKind::InvalidInput,
            CredentialError::DuplicateAccount => ErrorKind::DuplicateAccount,
            CredentialError::InvalidCredentials => ErrorKind::InvalidCredentials,
            CredentialError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            CredentialError::NotFound => ErrorKind::NotFound,
            CredentialError::Cancelled => ErrorKind::Cancelled,
            CredentialError::Store(_) | CredentialError::Hashing(_) | CredentialError::Token(_) => {
                ErrorKind::InternalError
            }
        }
    }
}

impl From<StoreError> for CredentialError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => CredentialError::DuplicateAccount,
            other => CredentialError::Store(other),
        }
    }
}

impl From<HashError> for CredentialError {
    fn from(err: HashError) -> Self {
        match err {
            HashError::PasswordTooLong { max } => {
                CredentialError::InvalidInput(format!("Password must be at most {max} bytes long"))
            }
            other => CredentialError::Hashing(other),
        }
    }
}

/// API error type that can be converted to HTTP responses
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Credential(err) => err.kind(),
            ApiError::Internal(_) => ErrorKind::InternalError,
        }
    }
}

// The raw rejection can quote the body back, so only its status is logged
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(status = %rejection.status(), "Rejected request body");
        ApiError::Credential(CredentialError::InvalidInput(
            "Invalid request body".to_string(),
        ))
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::DuplicateAccount => StatusCode::CONFLICT,
        ErrorKind::InvalidCredentials | ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = if kind.is_client_fault() {
            self.to_string()
        } else {
            error!(error = ?self, "Request failed");
            match kind {
                ErrorKind::Cancelled => "The request did not complete in time".to_string(),
                _ => "An internal error occurred".to_string(),
            }
        };

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                code: kind,
                message,
            },
        });

        (status_for(kind), body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
