//! Authentication module
//!
//! Provides JWT-based authentication with bcrypt/argon2 password hashing.

mod jwt;
mod middleware;
mod password;

pub use jwt::{Claims, JwtService, TokenError, DEVELOPMENT_SIGNING_KEY};
pub use middleware::{authenticate, require_auth, AuthUser};
pub use password::{HashError, PasswordService};
