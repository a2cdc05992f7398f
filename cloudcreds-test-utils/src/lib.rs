//! Test utilities shared across the cloudcreds workspace
//!
//! This crate provides common testing infrastructure including:
//! - XDG config directory mocking ([`EnvTestGuard`])
//! - HOME directory isolation ([`HomeEnvTestGuard`])
//! - Unsigned JWT fixtures for token-claim decoding ([`jwt`])
//!
//! The clippy dead_code lint is disabled for this crate because test utilities
//! may not be used by all tests, and the compiler cannot detect usage across
//! crate boundaries in development dependencies.

#![allow(dead_code)]

pub mod env;
pub mod home;
pub mod jwt;

// Re-export commonly used items
pub use env::EnvTestGuard;
pub use home::HomeEnvTestGuard;
pub use jwt::{service_principal_token, unsigned_jwt, user_token};
