//! Listener configuration
//!
//! Settings come from an optional YAML file named by `FUELWATCH_CONFIG`,
//! then individual environment overrides:
//!
//! | Variable           | Field          | Default   |
//! |--------------------|----------------|-----------|
//! | `FUELWATCH_BIND`   | `bind_address` | `0.0.0.0` |
//! | `FUELWATCH_PORT`   | `port`         | `27000`   |
//!
//! ```yaml
//! bind_address: 127.0.0.1
//! port: 27000
//! read_buffer_size: 128
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::session::DEFAULT_READ_BUFFER_SIZE;
use crate::{IngestError, Result};

/// Default TCP port telemetry senders connect to.
pub const DEFAULT_PORT: u16 = 27000;

pub const CONFIG_PATH_VAR: &str = "FUELWATCH_CONFIG";
pub const PORT_VAR: &str = "FUELWATCH_PORT";
pub const BIND_VAR: &str = "FUELWATCH_BIND";

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_address: IpAddr,
    /// Port the listener binds to. `0` picks an ephemeral port.
    pub port: u16,
    /// Initial per-session read buffer capacity in bytes.
    pub read_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    /// Socket address to bind.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Parse a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ServerConfig = serde_yaml_ng::from_str(yaml)
            .map_err(|e| IngestError::config("YAML configuration", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| IngestError::ConfigFile {
            path: PathBuf::from(path),
            source,
        })?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_yaml(&yaml)
    }

    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Build configuration using `lookup` to read variables.
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut config = match var(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(port) = var(PORT_VAR) {
            config.port = port
                .parse()
                .map_err(|_| IngestError::config(PORT_VAR, format!("invalid port '{port}'")))?;
        }

        if let Some(bind) = var(BIND_VAR) {
            config.bind_address = bind
                .parse()
                .map_err(|_| IngestError::config(BIND_VAR, format!("invalid address '{bind}'")))?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.read_buffer_size == 0 {
            return Err(IngestError::config("read_buffer_size", "must be at least 1 byte"));
        }
        Ok(())
    }
}
