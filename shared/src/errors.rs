//! Error kinds and the error response body

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome classes of the credential core
///
/// Clients switch on these codes, never on message text. Kinds that could
/// reveal whether an email is registered, or why a token was refused, are
/// deliberately coarse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidInput,
    DuplicateAccount,
    InvalidCredentials,
    Unauthenticated,
    NotFound,
    Cancelled,
    InternalError,
}

impl ErrorKind {
    /// Stable wire code
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::DuplicateAccount => "DUPLICATE_ACCOUNT",
            ErrorKind::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorKind::Unauthenticated => "UNAUTHENTICATED",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Cancelled => "CANCELLED",
            ErrorKind::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller can fix the request and retry
    pub fn is_client_fault(self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidInput
                | ErrorKind::DuplicateAccount
                | ErrorKind::InvalidCredentials
                | ErrorKind::Unauthenticated
                | ErrorKind::NotFound
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: ErrorKind,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_matches_serde_name() {
        for kind in [
            ErrorKind::InvalidInput,
            ErrorKind::DuplicateAccount,
            ErrorKind::InvalidCredentials,
            ErrorKind::Unauthenticated,
            ErrorKind::NotFound,
            ErrorKind::Cancelled,
            ErrorKind::InternalError,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.code()));
        }
    }

    #[test]
    fn test_client_fault_split() {
        assert!(ErrorKind::InvalidCredentials.is_client_fault());
        assert!(ErrorKind::Unauthenticated.is_client_fault());
        assert!(!ErrorKind::Cancelled.is_client_fault());
        assert!(!ErrorKind::InternalError.is_client_fault());
    }
}
