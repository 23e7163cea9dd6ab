//! PomoDeep Backend Library
//!
//! Credential lifecycle for the PomoDeep API: password hashing, token
//! issuance and validation, signup/signin rules and the request gate.
//! Exposed as a library for tests and the binary.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
