//! Input validation functions
//!
//! Credential shape checks shared by the backend and clients. These run
//! before any store access, so a rejected request never touches an account.

use validator::ValidateEmail;

/// Minimum password length used when none is configured
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 6;

/// Validate email format
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }
    if !email.validate_email() {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

/// Validate password length
///
/// Length is counted in characters, not bytes.
pub fn validate_password(password: &str, min_length: usize) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password cannot be empty".to_string());
    }
    if password.chars().count() < min_length {
        return Err(format!(
            "Password must be at least {} characters long",
            min_length
        ));
    }
    Ok(())
}

/// Validation error with field context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Rules applied to an email/password pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialRules {
    pub min_password_length: usize,
    /// Reject emails that are not syntactically addresses. Off by default:
    /// the email is otherwise an opaque lookup key.
    pub check_email_format: bool,
}

impl Default for CredentialRules {
    fn default() -> Self {
        Self {
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
            check_email_format: false,
        }
    }
}

/// Validate an email/password pair as presented at signup or signin
///
/// Presence is checked for both fields before anything else, then the
/// password length, then (if enabled) the email syntax.
pub fn validate_credentials(
    email: &str,
    password: &str,
    rules: &CredentialRules,
) -> Result<(), ValidationError> {
    if email.is_empty() || password.is_empty() {
        return Err(ValidationError::new(
            "credentials",
            "Email and password are required",
        ));
    }
    validate_password(password, rules.min_password_length)
        .map_err(|msg| ValidationError::new("password", msg))?;
    if rules.check_email_format {
        validate_email(email).map_err(|msg| ValidationError::new("email", msg))?;
    }
    Ok(())
}
