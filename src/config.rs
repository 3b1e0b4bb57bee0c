//! Configuration management for the decoy FTP server
//!
//! Loads a typed configuration snapshot from `config.toml` with
//! environment-variable overrides. The snapshot is immutable after startup
//! and passed by `Arc` into every session handler.

use std::collections::HashMap;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

fn default_failure_limit() -> u32 {
    3
}

fn default_auth_delay_secs() -> u64 {
    1
}

fn default_max_command_length() -> usize {
    4096
}

/// Descriptor for an HTTP endpoint backing future RETR (pull) or STOR
/// (push) support.
#[derive(Debug, Deserialize, Clone)]
pub struct EndpointConfig {
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Complete server configuration, loaded once at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address and port for the control-channel listener.
    pub address: String,
    pub port: u16,

    /// Inclusive port range handed out for passive data connections.
    pub data_port_begin: u16,
    pub data_port_end: u16,

    /// When true, active-mode reservations come from a dedicated
    /// single-port pool (port 20) instead of sharing the passive range.
    pub strict_active_mode: bool,

    /// When true, unrecognized commands are acknowledged with 200 instead
    /// of rejected with 500.
    pub permissive: bool,

    /// Fake working directory reported by PWD.
    pub fakedir_root: String,

    /// Fake directory listing returned by LIST, in order.
    pub fakedir_list: Vec<String>,

    /// Message-of-the-day sent after the banner, and HELP text.
    pub motd: String,
    pub help: String,

    /// Path to the "username password" credential file.
    pub credentials_file: String,

    /// Authentication failures tolerated before the session is closed.
    #[serde(default = "default_failure_limit")]
    pub failure_limit: u32,

    /// Seconds to sleep after a failed USER/PASS before replying.
    #[serde(default = "default_auth_delay_secs")]
    pub auth_delay_secs: u64,

    /// Upper bound on one control-channel line; longer lines are rejected.
    #[serde(default = "default_max_command_length")]
    pub max_command_length: usize,

    /// Optional endpoints for the (stubbed) HTTP-backed transfer path.
    #[serde(default)]
    pub pull: Option<EndpointConfig>,
    #[serde(default)]
    pub push: Option<EndpointConfig>,
}

impl ServerConfig {
    /// Load configuration from config.toml with environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a named file (without extension), then
    /// apply `DECOY_FTP__*` environment overrides and validate.
    ///
    /// The key separator is a double underscore so that multi-word field
    /// names survive: `DECOY_FTP__DATA_PORT_BEGIN` maps to
    /// `data_port_begin` instead of the nested key `data.port.begin` a
    /// single underscore would produce.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("DECOY_FTP").separator("__"))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values. Violations refuse startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("data_port_begin", self.data_port_begin),
            ("data_port_end", self.data_port_end),
        ] {
            if value < 1024 {
                return Err(ConfigError::Message(format!(
                    "Bad {} value: {} (must be in 1024..=65535)",
                    name, value
                )));
            }
        }

        if self.data_port_begin > self.data_port_end {
            return Err(ConfigError::Message(
                "Bad data port values (data_port_begin must be <= data_port_end)".into(),
            ));
        }

        if self.fakedir_list.is_empty() {
            return Err(ConfigError::Message("fakedir_list cannot be empty".into()));
        }

        if self.fakedir_root.is_empty() {
            return Err(ConfigError::Message("fakedir_root cannot be empty".into()));
        }

        if self.failure_limit == 0 {
            return Err(ConfigError::Message(
                "failure_limit must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Get listen address and port as a socket address string.
    pub fn control_socket(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".into(),
            port: 2121,
            data_port_begin: 2122,
            data_port_end: 2221,
            strict_active_mode: false,
            permissive: false,
            fakedir_root: "/pub".into(),
            fakedir_list: vec![
                "drwxr-xr-x 2 ftp ftp 4096 Jan 01 00:00 incoming".into(),
                "-rw-r--r-- 1 ftp ftp 1024 Jan 01 00:00 readme.txt".into(),
            ],
            motd: "Welcome".into(),
            help: "Commands: USER PASS QUIT REIN PWD TYPE LIST FEAT STRU SYST STAT HELP NOOP"
                .into(),
            credentials_file: "credentials.txt".into(),
            failure_limit: default_failure_limit(),
            auth_delay_secs: default_auth_delay_secs(),
            max_command_length: default_max_command_length(),
            pull: None,
            push: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_privileged_data_port() {
        let config = ServerConfig {
            data_port_begin: 80,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_data_port_range() {
        let config = ServerConfig {
            data_port_begin: 5000,
            data_port_end: 4000,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_failure_limit() {
        let config = ServerConfig {
            failure_limit: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_control_socket_formatting() {
        let config = ServerConfig::default();
        assert_eq!(config.control_socket(), "127.0.0.1:2121");
    }

    #[test]
    fn test_environment_overrides_multiword_field() {
        let dir = std::env::temp_dir().join(format!("decoy-ftp-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("config.toml");
        std::fs::write(
            &file,
            r#"
address = "127.0.0.1"
port = 2121
data_port_begin = 2122
data_port_end = 2221
strict_active_mode = false
permissive = false
fakedir_root = "/pub"
fakedir_list = ["-rw-r--r-- 1 ftp ftp 1024 Jan 01 00:00 readme.txt"]
motd = "Welcome"
help = "Commands: USER PASS QUIT"
credentials_file = "credentials.txt"
"#,
        )
        .unwrap();

        // No other test reads these variables, so mutating the process
        // environment here cannot race.
        unsafe {
            std::env::set_var("DECOY_FTP__DATA_PORT_BEGIN", "2150");
            std::env::set_var("DECOY_FTP__PORT", "2222");
        }
        let config = ServerConfig::load_from(dir.join("config").to_str().unwrap()).unwrap();
        unsafe {
            std::env::remove_var("DECOY_FTP__DATA_PORT_BEGIN");
            std::env::remove_var("DECOY_FTP__PORT");
        }

        assert_eq!(config.data_port_begin, 2150);
        assert_eq!(config.port, 2222);
        assert_eq!(config.data_port_end, 2221);
    }
}
