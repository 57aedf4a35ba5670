//! Configuration management for the Keel FTP server
//!
//! Values are layered: built-in defaults, then an optional `config.toml`,
//! then `KEEL_FTP__<SECTION>__<KEY>` environment variables.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "KEEL_FTP";
const DEFAULT_CONFIG_FILE: &str = "config";

/// Complete server configuration
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ListenerConfig,
    pub data: DataConfig,
    pub session: SessionConfig,
    pub auth: AuthConfig,
    pub log: LogConfig,
}

/// Control connection listener settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ListenerConfig {
    /// IP address to bind the FTP control connection
    pub bind_address: String,

    /// Port for the FTP control connection
    pub control_port: u16,

    /// Maximum number of concurrently connected sessions
    pub max_clients: usize,

    /// Text sent with the 220 banner
    pub greeting: String,
}

/// Data channel settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataConfig {
    /// Port range for PASV/EPSV listeners. `port_min = 0` lets the OS choose.
    pub port_min: u16,
    pub port_max: u16,

    /// Address advertised in 227 replies instead of the control socket's local IP
    pub public_ip: Option<Ipv4Addr>,

    /// How long a passive listener waits for the client to connect
    pub accept_timeout_secs: u64,

    /// How long an active-mode connect may take
    pub connect_timeout_secs: u64,

    /// Chunk size used when streaming file content
    pub buffer_size: usize,

    /// Allow PORT/EPRT to name a host other than the control peer
    pub allow_foreign_port_target: bool,
}

/// Per-session limits
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory every session is confined to
    pub server_root: String,

    pub idle_timeout_secs: u64,
    pub max_command_length: usize,
    pub max_login_attempts: u32,
}

/// Settings for the built-in credential check
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// Accept any password for the names in `anonymous_users`
    pub anonymous: bool,
    pub anonymous_users: Vec<String>,
    pub users: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            control_port: 2121,
            max_clients: 100,
            greeting: "Welcome to Keel FTP Server".to_string(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            port_min: 50000,
            port_max: 50100,
            public_ip: None,
            accept_timeout_secs: 30,
            connect_timeout_secs: 10,
            buffer_size: 8192,
            allow_foreign_port_target: false,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_root: "./ftp_root".to_string(),
            idle_timeout_secs: 300,
            max_command_length: 512,
            max_login_attempts: 3,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            anonymous: true,
            anonymous_users: vec!["anonymous".to_string(), "ftp".to_string()],
            users: HashMap::new(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file with environment overrides.
    ///
    /// Without an explicit path `./config.toml` is used if present; an
    /// explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.server.control_port == 0 {
            return Err(config::ConfigError::Message(
                "Control port cannot be 0".into(),
            ));
        }

        if self.server.max_clients == 0 {
            return Err(config::ConfigError::Message(
                "max_clients must be greater than 0".into(),
            ));
        }

        if self.data.port_min != 0 && self.data.port_min > self.data.port_max {
            return Err(config::ConfigError::Message(
                "data.port_min must not exceed data.port_max".into(),
            ));
        }

        if self.data.buffer_size == 0 {
            return Err(config::ConfigError::Message(
                "data.buffer_size must be greater than 0".into(),
            ));
        }

        if self.session.server_root.is_empty() {
            return Err(config::ConfigError::Message(
                "session.server_root cannot be empty".into(),
            ));
        }

        if self.session.max_login_attempts == 0 {
            return Err(config::ConfigError::Message(
                "session.max_login_attempts must be greater than 0".into(),
            ));
        }

        if self.session.max_command_length < 16 {
            return Err(config::ConfigError::Message(
                "session.max_command_length must be at least 16".into(),
            ));
        }

        Ok(())
    }

    /// Bind address and control port as a socket address string
    pub fn control_socket(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.control_port)
    }

    /// Port range for PASV/EPSV listeners; `0..=0` means ephemeral
    pub fn passive_ports(&self) -> RangeInclusive<u16> {
        if self.data.port_min == 0 {
            0..=0
        } else {
            self.data.port_min..=self.data.port_max
        }
    }

    pub fn server_root_path(&self) -> PathBuf {
        PathBuf::from(&self.session.server_root)
    }

    pub fn accept_timeout(&self) -> Duration {
        Duration::from_secs(self.data.accept_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.data.connect_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session.idle_timeout_secs)
    }
}
