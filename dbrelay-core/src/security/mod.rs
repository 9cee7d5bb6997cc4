//! Credential protection.
//!
//! # Security Guarantees
//! - Passwords are stored in `Zeroizing` containers for automatic memory clearing
//! - `Debug` output never includes the password
//! - Credentials are never serialized

mod credentials;

pub use credentials::Credentials;
