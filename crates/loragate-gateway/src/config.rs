//! Gateway configuration file.
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//! read_timeout_ms = 1000
//! open_attempts = 1
//! open_retry_delay_ms = 1000
//! read_error_backoff_ms = 1000
//!
//! [backend]
//! url = "http://192.168.1.52:8000/api/core/iot/events"
//! timeout_ms = 5000
//! failure_backoff_ms = 1000
//!
//! [[devices]]
//! node_id = 12
//! key = "e037ba73d57ab535"
//! ```
//!
//! Everything except `serial.port`, `backend.url` and the device list has a
//! default. The port and URL may also come from the command line, so
//! parsing and validation are separate steps.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use loragate_core::DeviceKey;
use loragate_core::constants::{
    DEFAULT_BACKEND_FAILURE_BACKOFF, DEFAULT_BAUD_RATE, DEFAULT_HTTP_TIMEOUT,
    DEFAULT_OPEN_ATTEMPTS, DEFAULT_OPEN_RETRY_DELAY, DEFAULT_READ_ERROR_BACKOFF,
    DEFAULT_SERIAL_READ_TIMEOUT,
};
use loragate_hardware::SerialConfig;
use loragate_network::ForwarderConfig;
use serde::{Deserialize, Serialize};

use crate::auth::DeviceKeyTable;
use crate::gateway::RunLoopConfig;

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Serial receiver settings.
    #[serde(default)]
    pub serial: SerialSection,

    /// Backend endpoint settings.
    #[serde(default)]
    pub backend: BackendSection,

    /// Device key table.
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

/// `[serial]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSection {
    /// Device path, e.g. `/dev/ttyUSB0`.
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Open attempts before giving up.
    #[serde(default = "default_open_attempts")]
    pub open_attempts: u32,

    #[serde(default = "default_open_retry_delay_ms")]
    pub open_retry_delay_ms: u64,

    /// Pause after a failed read.
    #[serde(default = "default_read_error_backoff_ms")]
    pub read_error_backoff_ms: u64,
}

impl Default for SerialSection {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            open_attempts: default_open_attempts(),
            open_retry_delay_ms: default_open_retry_delay_ms(),
            read_error_backoff_ms: default_read_error_backoff_ms(),
        }
    }
}

/// `[backend]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSection {
    /// Events endpoint.
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,

    /// Pause after a request that got no response.
    #[serde(default = "default_failure_backoff_ms")]
    pub failure_backoff_ms: u64,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_ms: default_http_timeout_ms(),
            failure_backoff_ms: default_failure_backoff_ms(),
        }
    }
}

/// One `[[devices]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub node_id: i64,
    pub key: DeviceKey,
}

const fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

const fn default_read_timeout_ms() -> u64 {
    DEFAULT_SERIAL_READ_TIMEOUT
}

const fn default_open_attempts() -> u32 {
    DEFAULT_OPEN_ATTEMPTS
}

const fn default_open_retry_delay_ms() -> u64 {
    DEFAULT_OPEN_RETRY_DELAY
}

const fn default_read_error_backoff_ms() -> u64 {
    DEFAULT_READ_ERROR_BACKOFF
}

const fn default_http_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT
}

const fn default_failure_backoff_ms() -> u64 {
    DEFAULT_BACKEND_FAILURE_BACKOFF
}

impl GatewayConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// The result is not validated; call [`validate`](Self::validate) after
    /// applying overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a device key is empty.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check the values the gateway cannot run without.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.port.trim().is_empty() {
            return Err(ConfigError::Validation(
                "serial.port must be set".to_string(),
            ));
        }
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Validation(
                "serial.baud_rate must be greater than zero".to_string(),
            ));
        }
        if self.serial.read_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "serial.read_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.serial.open_attempts == 0 {
            return Err(ConfigError::Validation(
                "serial.open_attempts must be at least 1".to_string(),
            ));
        }
        if self.backend.url.trim().is_empty() {
            return Err(ConfigError::Validation("backend.url must be set".to_string()));
        }
        if self.backend.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "backend.timeout_ms must be greater than zero".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.devices.len());
        for device in &self.devices {
            if !seen.insert(device.node_id) {
                return Err(ConfigError::Validation(format!(
                    "duplicate device entry for node {}",
                    device.node_id
                )));
            }
        }

        Ok(())
    }

    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            port: self.serial.port.clone(),
            baud_rate: self.serial.baud_rate,
            read_timeout: Duration::from_millis(self.serial.read_timeout_ms),
        }
    }

    pub fn forwarder_config(&self) -> ForwarderConfig {
        ForwarderConfig {
            backend_url: self.backend.url.clone(),
            timeout: Duration::from_millis(self.backend.timeout_ms),
        }
    }

    pub fn run_loop_config(&self) -> RunLoopConfig {
        RunLoopConfig {
            open_attempts: self.serial.open_attempts,
            open_retry_delay: Duration::from_millis(self.serial.open_retry_delay_ms),
            read_error_backoff: Duration::from_millis(self.serial.read_error_backoff_ms),
            backend_failure_backoff: Duration::from_millis(self.backend.failure_backoff_ms),
        }
    }

    /// Build the device key table from `[[devices]]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] on duplicate node ids.
    pub fn key_table(&self) -> Result<DeviceKeyTable, ConfigError> {
        DeviceKeyTable::from_entries(
            self.devices
                .iter()
                .map(|device| (device.node_id, device.key.clone())),
        )
        .map_err(|e| ConfigError::Validation(e.to_string()))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const FULL: &str = r#"
        [serial]
        port = "/dev/ttyACM0"
        baud_rate = 9600
        read_timeout_ms = 250
        open_attempts = 3
        open_retry_delay_ms = 2000
        read_error_backoff_ms = 500

        [backend]
        url = "http://127.0.0.1:8000/api/core/iot/events"
        timeout_ms = 1500
        failure_backoff_ms = 750

        [[devices]]
        node_id = 12
        key = "e037ba73d57ab535"

        [[devices]]
        node_id = 13
        key = "0badc0ffee"
    "#;

    const MINIMAL: &str = r#"
        [serial]
        port = "/dev/ttyUSB0"

        [backend]
        url = "http://192.168.1.52:8000/api/core/iot/events"
    "#;

    #[test]
    fn test_parse_full() {
        let config = GatewayConfig::from_toml(FULL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.open_attempts, 3);
        assert_eq!(config.backend.timeout_ms, 1500);
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[0].node_id, 12);
        assert_eq!(config.devices[0].key.expose(), "e037ba73d57ab535");

        let serial = config.serial_config();
        assert_eq!(serial.read_timeout, Duration::from_millis(250));

        let forwarder = config.forwarder_config();
        assert_eq!(forwarder.timeout, Duration::from_millis(1500));

        let run = config.run_loop_config();
        assert_eq!(run.open_attempts, 3);
        assert_eq!(run.open_retry_delay, Duration::from_secs(2));
        assert_eq!(run.read_error_backoff, Duration::from_millis(500));
        assert_eq!(run.backend_failure_backoff, Duration::from_millis(750));
    }

    #[test]
    fn test_defaults_applied() {
        let config = GatewayConfig::from_toml(MINIMAL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.serial.read_timeout_ms, 1000);
        assert_eq!(config.serial.open_attempts, 1);
        assert_eq!(config.backend.timeout_ms, 5000);
        assert_eq!(config.backend.failure_backoff_ms, 1000);
        assert!(config.devices.is_empty());
        assert!(config.key_table().unwrap().is_empty());
    }

    #[test]
    fn test_empty_file_needs_overrides() {
        let mut config = GatewayConfig::from_toml("").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        config.serial.port = "/dev/ttyUSB1".to_string();
        config.backend.url = "http://localhost/events".to_string();
        config.validate().unwrap();
    }

    #[rstest]
    #[case("serial.port", |c: &mut GatewayConfig| c.serial.port = "  ".to_string())]
    #[case("serial.baud_rate", |c: &mut GatewayConfig| c.serial.baud_rate = 0)]
    #[case("serial.read_timeout_ms", |c: &mut GatewayConfig| c.serial.read_timeout_ms = 0)]
    #[case("serial.open_attempts", |c: &mut GatewayConfig| c.serial.open_attempts = 0)]
    #[case("backend.url", |c: &mut GatewayConfig| c.backend.url = String::new())]
    #[case("backend.timeout_ms", |c: &mut GatewayConfig| c.backend.timeout_ms = 0)]
    fn test_validation_rejects(#[case] key: &str, #[case] mutate: fn(&mut GatewayConfig)) {
        let mut config = GatewayConfig::from_toml(MINIMAL).unwrap();
        mutate(&mut config);

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains(key), "{err}");
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let toml = format!(
            "{MINIMAL}\n[[devices]]\nnode_id = 7\nkey = \"a\"\n[[devices]]\nnode_id = 7\nkey = \"b\"\n"
        );
        let config = GatewayConfig::from_toml(&toml).unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("node 7"));
        assert!(config.key_table().is_err());
    }

    #[test]
    fn test_empty_device_key_rejected() {
        let toml = format!("{MINIMAL}\n[[devices]]\nnode_id = 1\nkey = \"  \"\n");
        assert!(matches!(
            GatewayConfig::from_toml(&toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_roundtrip_keeps_keys() {
        let config = GatewayConfig::from_toml(FULL).unwrap();
        let text = config.to_toml().unwrap();
        let reparsed = GatewayConfig::from_toml(&text).unwrap();

        assert_eq!(reparsed.serial, config.serial);
        assert_eq!(reparsed.backend, config.backend);
        assert_eq!(reparsed.devices, config.devices);
    }

    #[test]
    fn test_missing_file() {
        let err = GatewayConfig::from_file(Path::new("/nonexistent/loragate.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
