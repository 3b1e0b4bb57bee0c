//! Error types
//!
//! Defines domain-specific error types for each module of the server.
//! Protocol-level client errors are not represented here; they are turned
//! into FTP reply codes by the command handlers.

use std::fmt;
use std::io;

/// Fatal errors raised while bringing the server up.
#[derive(Debug)]
pub enum StartupError {
    Bind(String, io::Error),
    PortRange { begin: u16, end: u16 },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Bind(addr, e) => write!(f, "Failed to bind to {}: {}", addr, e),
            StartupError::PortRange { begin, end } => {
                write!(f, "Bad data port range: begin ({}) > end ({})", begin, end)
            }
        }
    }
}

impl std::error::Error for StartupError {}

/// Credential store errors
#[derive(Debug)]
pub enum CredentialError {
    Open(String, io::Error),
    Read(io::Error),
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::Open(path, e) => {
                write!(f, "Failed to open credential file {}: {}", path, e)
            }
            CredentialError::Read(e) => write!(f, "Failed to read credential file: {}", e),
        }
    }
}

impl std::error::Error for CredentialError {}

/// Transfer backend errors
#[derive(Debug)]
pub enum TransferError {
    NoEndpoint,
    NotImplemented,
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::NoEndpoint => write!(f, "No pull endpoint configured"),
            TransferError::NotImplemented => write!(f, "Content retrieval not implemented"),
        }
    }
}

impl std::error::Error for TransferError {}
