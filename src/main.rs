//! Decoy FTP Server - Entry Point
//!
//! A minimal FTP control-channel server that authenticates clients and
//! returns canned responses instead of performing real transfers.

use log::{error, info};

use decoy_ftp_server::Server;
use decoy_ftp_server::auth::CredentialStore;
use decoy_ftp_server::config::ServerConfig;

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    info!("Launching decoy FTP server...");

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let credentials = match CredentialStore::load(&config.credentials_file) {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("Error loading credentials: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::new(config, credentials).await {
        Ok(server) => server,
        Err(e) => {
            error!("Server startup failed: {}", e);
            std::process::exit(1);
        }
    };

    server.run().await;
}
