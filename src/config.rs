//! Simulator configuration.
//!
//! Read from a TOML file in which every section and key is optional:
//!
//! ```toml
//! [device]
//! id = 2001
//! name = "AHU-3 Controller"
//! vendorId = 999
//!
//! [bacnet]
//! bind_address = "0.0.0.0:47808"
//! broadcast_address = "192.168.1.255:47808"
//! announce_interval_secs = 30
//!
//! [http]
//! host = "127.0.0.1"
//! port = 3001
//! port_attempts = 10
//!
//! [simulation]
//! isRunning = true
//! interval = 1000
//! autoUpdate = true
//!
//! [protocol]
//! clamp_writes = false
//! ```
//!
//! The device and simulation sections use the same camelCase names as the
//! control API JSON.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::datalink::BACNET_IP_PORT;
use crate::http::DEFAULT_HTTP_PORT;
use crate::object::{Device, WritePolicy};
use crate::server::DEFAULT_ANNOUNCE_INTERVAL;
use crate::simulation::SimulationSettings;
use crate::transport::BacnetIpConfig;
use crate::util::is_valid_instance_number;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Initial device record
    pub device: Device,
    pub bacnet: BacnetSection,
    pub http: HttpSection,
    /// Initial simulation settings
    pub simulation: SimulationSettings,
    pub protocol: ProtocolSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacnetSection {
    pub bind_address: SocketAddr,
    /// Detected from the network interfaces when absent
    pub broadcast_address: Option<SocketAddr>,
    pub announce_interval_secs: u64,
    pub buffer_size: usize,
}

impl Default for BacnetSection {
    fn default() -> Self {
        let transport = BacnetIpConfig::default();
        Self {
            bind_address: transport.bind_address,
            broadcast_address: transport.broadcast_address,
            announce_interval_secs: DEFAULT_ANNOUNCE_INTERVAL.as_secs(),
            buffer_size: transport.buffer_size,
        }
    }
}

impl BacnetSection {
    pub fn transport_config(&self) -> BacnetIpConfig {
        BacnetIpConfig {
            bind_address: self.bind_address,
            broadcast_address: self.broadcast_address,
            buffer_size: self.buffer_size,
        }
    }

    pub fn announce_interval(&self) -> Duration {
        Duration::from_secs(self.announce_interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub host: IpAddr,
    pub port: u16,
    /// How many consecutive ports to try, starting at `port`
    pub port_attempts: u16,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_HTTP_PORT,
            port_attempts: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolSection {
    /// Clamp protocol present value writes to the point's bounds
    pub clamp_writes: bool,
}

impl ProtocolSection {
    pub fn write_policy(&self) -> WritePolicy {
        if self.clamp_writes {
            WritePolicy::Clamp
        } else {
            WritePolicy::Verbatim
        }
    }
}

impl SimulatorConfig {
    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulatorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_instance_number(self.device.id) {
            return Err(ConfigError::Invalid(format!(
                "device id {} is outside 0..=4194302",
                self.device.id
            )));
        }
        if self.bacnet.announce_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "bacnet.announce_interval_secs must be positive".to_string(),
            ));
        }
        if self.bacnet.buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "bacnet.buffer_size must be positive".to_string(),
            ));
        }
        if self.http.port_attempts == 0 {
            return Err(ConfigError::Invalid(
                "http.port_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_bacnet_port(mut self, port: u16) -> Self {
        self.bacnet.bind_address.set_port(port);
        if let Some(broadcast) = self.bacnet.broadcast_address.as_mut() {
            broadcast.set_port(port);
        }
        self
    }
}

/// Port the simulator speaks BACnet/IP on unless configured otherwise
pub const DEFAULT_BACNET_PORT: u16 = BACNET_IP_PORT;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = SimulatorConfig::from_toml_str("").unwrap();
        assert_eq!(config, SimulatorConfig::default());
        assert_eq!(config.device.id, 1001);
        assert_eq!(config.bacnet.bind_address.port(), DEFAULT_BACNET_PORT);
        assert_eq!(config.bacnet.announce_interval(), Duration::from_secs(30));
        assert_eq!(config.http.port, 3001);
        assert_eq!(config.protocol.write_policy(), WritePolicy::Verbatim);
    }

    #[test]
    fn test_partial_sections() {
        let config = SimulatorConfig::from_toml_str(
            r#"
            [device]
            id = 2001
            name = "AHU-3 Controller"

            [bacnet]
            broadcast_address = "192.168.1.255:47808"

            [simulation]
            isRunning = true
            autoUpdate = true

            [protocol]
            clamp_writes = true
            "#,
        )
        .unwrap();

        assert_eq!(config.device.id, 2001);
        assert_eq!(config.device.vendor_id, 999);
        assert_eq!(
            config.bacnet.transport_config().broadcast_address,
            Some("192.168.1.255:47808".parse().unwrap())
        );
        assert!(config.simulation.is_active());
        assert_eq!(config.simulation.interval_ms, 1000);
        assert_eq!(config.protocol.write_policy(), WritePolicy::Clamp);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = SimulatorConfig::from_toml_str("[device]\nid = 4194303\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SimulatorConfig::from_toml_str("[http]\nport_attempts = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SimulatorConfig::from_toml_str("[http\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_bacnet_port_override() {
        let mut config = SimulatorConfig::default();
        config.bacnet.broadcast_address = Some("10.0.0.255:47808".parse().unwrap());

        let config = config.with_bacnet_port(47809);
        assert_eq!(config.bacnet.bind_address.port(), 47809);
        assert_eq!(config.bacnet.broadcast_address.unwrap().port(), 47809);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("bacnet-sim-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[http]\nport = 8080\n").unwrap();

        let config = SimulatorConfig::load(&path).unwrap();
        assert_eq!(config.http.port, 8080);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            SimulatorConfig::load(&path),
            Err(ConfigError::Io { .. })
        ));
    }
}
