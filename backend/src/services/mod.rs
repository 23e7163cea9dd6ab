//! Business logic services
//!
//! Services encapsulate business logic and coordinate between
//! account stores, the password hasher and the token authority.

pub mod context;
pub mod credentials;

pub use context::RequestContext;
pub use credentials::CredentialService;
