//! Module `session`
//!
//! Defines the `Session` struct tracking per-connection FTP state:
//! authentication progress, failure count, and negotiated transfer
//! parameters. A session is owned by exactly one connection task and is
//! never shared, so no synchronization is needed here.

use std::net::Ipv4Addr;

/// State of one accepted control connection.
pub struct Session {
    host: String,
    local_ip: Option<Ipv4Addr>,
    authenticated: bool,
    username: String,
    failures: u32,
    upload_requested: bool,
    download_requested: bool,
    passive_mode: bool,
    data_port: Option<u16>,
}

impl Session {
    pub fn new(host: String) -> Self {
        Self {
            host,
            local_ip: None,
            authenticated: false,
            username: String::new(),
            failures: 0,
            upload_requested: false,
            download_requested: false,
            passive_mode: false,
            data_port: None,
        }
    }

    /// Remote peer identifier, fixed at creation.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// IPv4 address the client reached us on, if known. Advertised in
    /// PASV replies when the configured bind address is not usable.
    pub fn local_ip(&self) -> Option<Ipv4Addr> {
        self.local_ip
    }

    pub fn set_local_ip(&mut self, ip: Option<Ipv4Addr>) {
        self.local_ip = ip;
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Count of rejected authentication attempts in this session.
    /// Monotonically increasing; a successful login does not reset it.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    /// Records the claimed identity after a successful USER command.
    /// The session is not authenticated until PASS succeeds.
    pub fn set_username(&mut self, username: &str) {
        self.username = username.to_string();
        self.authenticated = false;
    }

    /// Marks the session authenticated after a successful PASS command.
    pub fn set_authenticated(&mut self) {
        self.authenticated = true;
    }

    /// Handles REIN: clears the authenticated flag and the username.
    /// The failure count survives re-initialization.
    pub fn reinitialize(&mut self) {
        self.authenticated = false;
        self.username.clear();
    }

    pub fn upload_requested(&self) -> bool {
        self.upload_requested
    }

    pub fn set_upload_requested(&mut self, requested: bool) {
        self.upload_requested = requested;
    }

    pub fn download_requested(&self) -> bool {
        self.download_requested
    }

    pub fn set_download_requested(&mut self, requested: bool) {
        self.download_requested = requested;
    }

    pub fn passive_mode(&self) -> bool {
        self.passive_mode
    }

    pub fn set_passive_mode(&mut self, passive: bool) {
        self.passive_mode = passive;
    }

    pub fn data_port(&self) -> Option<u16> {
        self.data_port
    }

    pub fn set_data_port(&mut self, port: Option<u16>) {
        self.data_port = port;
    }

    /// Takes the negotiated data port out of the session, leaving None.
    pub fn take_data_port(&mut self) -> Option<u16> {
        self.data_port.take()
    }
}
