//! Module `server`
//!
//! Binds the control-channel listener, spawns the port pools, and accepts
//! connections, handing each one to a dedicated session task.

use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info};
use tokio::net::TcpListener;

use crate::auth::CredentialStore;
use crate::client_handler::handle_client;
use crate::config::ServerConfig;
use crate::error::StartupError;
use crate::port_pool::PortPool;
use crate::transfer::PullBackend;

pub const SERVER_NAME: &str = "decoy-ftp-server";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Traditional FTP active-mode data port, used by the dedicated pool when
/// strict active mode is configured.
pub const ACTIVE_DATA_PORT: u16 = 20;

/// Immutable context shared with every session task: configuration and
/// credential snapshots plus handles to the two port pools. The pools are
/// the only shared mutable state in the process.
#[derive(Clone)]
pub struct ServerContext {
    pub config: Arc<ServerConfig>,
    pub credentials: Arc<CredentialStore>,
    pub passive_ports: PortPool,
    pub active_ports: PortPool,
    pub pull: PullBackend,
}

pub struct Server {
    listener: TcpListener,
    context: ServerContext,
}

impl Server {
    /// Binds the listener and seeds the port pools. Any failure here is a
    /// fatal startup error.
    pub async fn new(
        config: ServerConfig,
        credentials: CredentialStore,
    ) -> Result<Self, StartupError> {
        let addr = config.control_socket();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| StartupError::Bind(addr.clone(), e))?;
        info!("Server bound to {}", addr);

        let passive_ports = PortPool::spawn(config.data_port_begin, config.data_port_end)?;
        let active_ports = if config.strict_active_mode {
            PortPool::spawn(ACTIVE_DATA_PORT, ACTIVE_DATA_PORT)?
        } else {
            // Shared mode: active-mode reservations draw from the passive range.
            passive_ports.clone()
        };

        let context = ServerContext {
            pull: PullBackend::new(config.pull.clone()),
            config: Arc::new(config),
            credentials: Arc::new(credentials),
            passive_ports,
            active_ports,
        };

        Ok(Self { listener, context })
    }

    /// Actual listen address, useful when configured with port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever, one session task per client.
    pub async fn run(&self) {
        info!("Listening on {}", self.context.config.control_socket());

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!("New connection: {}", addr);
                    let ctx = self.context.clone();
                    tokio::spawn(async move {
                        handle_client(stream, addr.to_string(), ctx).await;
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}
