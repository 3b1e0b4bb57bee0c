//! Module `transfer`
//!
//! Collaborator seam for the (future) HTTP-backed content path behind
//! RETR. The backend carries the configured pull endpoint descriptor but
//! does not fetch anything yet; every request reports failure, and the
//! command handler surfaces that to the client as a 500.

use log::info;

use crate::config::EndpointConfig;
use crate::error::TransferError;

/// Stub content-retrieval backend for RETR.
#[derive(Clone)]
pub struct PullBackend {
    endpoint: Option<EndpointConfig>,
}

impl PullBackend {
    pub fn new(endpoint: Option<EndpointConfig>) -> Self {
        Self { endpoint }
    }

    /// Fetches the content that would be streamed over a data connection.
    ///
    /// TODO: issue a GET against the configured endpoint with its headers
    /// and return the body once a real data channel exists.
    pub async fn fetch(&self, path: &str) -> Result<Vec<u8>, TransferError> {
        match &self.endpoint {
            Some(endpoint) => {
                info!(
                    "RETR {}: pull endpoint {} configured but retrieval is not implemented",
                    path, endpoint.url
                );
                Err(TransferError::NotImplemented)
            }
            None => Err(TransferError::NoEndpoint),
        }
    }
}
