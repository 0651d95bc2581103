//! # SolarMart Shared Library
//!
//! This crate contains shared types, persistence, and integration code used by
//! the SolarMart API server.
//!
//! ## Module Organization
//!
//! - `db`: Connection pooling and migrations
//! - `models`: Database models and their queries
//! - `auth`: Password hashing, JWT tokens, and role checks
//! - `redis`: Redis client wrapper
//! - `otp`: One-time password generation and storage
//! - `notify`: Outbound e-mail and WhatsApp delivery

pub mod auth;
pub mod db;
pub mod models;
pub mod notify;
pub mod otp;
pub mod redis;

/// Current version of the SolarMart shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
