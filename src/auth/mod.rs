//! Authentication system
//!
//! Holds the read-only credential store loaded once at startup.

pub mod credentials;

pub use credentials::CredentialStore;
