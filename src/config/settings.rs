//! Configuration structures for echolog

use crate::{EchoLogError, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listener settings
    pub server: ServerSettings,
    /// Journal storage settings
    pub storage: StorageSettings,
    /// Timestamp emitter settings
    pub timestamp: TimestampSettings,
}

/// Core listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address to bind the listening socket to
    pub bind_address: IpAddr,
    /// TCP port to listen on
    pub port: u16,
    /// Listen backlog
    pub backlog: u32,
    /// Increment, in bytes, by which a connection's receive buffer grows
    /// each time it fills
    pub recv_buffer_size: usize,
}

/// Journal storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Path of the append-only journal file
    pub data_file: PathBuf,
}

/// Timestamp emitter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampSettings {
    /// Enable the periodic timestamp emitter
    pub enabled: bool,
    /// Seconds between timestamp records
    pub period_secs: u64,
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server address to connect to, as `host:port`
    pub server_address: String,
    /// Connection and first-response timeout in seconds
    pub timeout_seconds: u64,
    /// Quiet window, in milliseconds, after which an echoed journal is
    /// considered fully received
    pub response_quiet_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                port: 9000,
                backlog: 10,
                recv_buffer_size: 1024,
            },
            storage: StorageSettings {
                data_file: PathBuf::from("/var/tmp/echolog.data"),
            },
            timestamp: TimestampSettings {
                enabled: true,
                period_secs: 10,
            },
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1:9000".to_string(),
            timeout_seconds: 5,
            response_quiet_ms: 200,
        }
    }
}

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EchoLogError::Config(format!("Failed to read config file: {}", e)))?;

        let config: ServerConfig = toml::from_str(&content)
            .map_err(|e| EchoLogError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.backlog == 0 {
            return Err(EchoLogError::Config("Backlog must be at least 1".to_string()));
        }
        if self.server.recv_buffer_size == 0 {
            return Err(EchoLogError::Config(
                "Receive buffer increment must be at least 1 byte".to_string(),
            ));
        }
        if self.storage.data_file.as_os_str().is_empty() {
            return Err(EchoLogError::Config("Journal file path cannot be empty".to_string()));
        }
        if self.timestamp.enabled && self.timestamp.period_secs == 0 {
            return Err(EchoLogError::Config(
                "Timestamp period must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    /// The socket address the listener binds to. Port 0 asks the OS for an
    /// ephemeral port.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.bind_address, self.server.port)
    }
}

impl ClientConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server_address.is_empty() {
            return Err(EchoLogError::Config("Server address cannot be empty".to_string()));
        }
        Ok(())
    }
}
