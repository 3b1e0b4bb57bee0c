pub mod auth;
pub mod client_handler;
pub mod commands;
pub mod config;
pub mod error;
pub mod port_pool;
pub mod protocol;
pub mod server;
pub mod session;
pub mod transfer;

pub use server::Server;
