//! Service configuration
//!
//! Loaded from `config/stovesrv.yaml` (or `--config`), then overridden by
//! `STOVESRV_SECTION__KEY` environment variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use duepi_evo::constants::{DEFAULT_HOST, DEFAULT_PORT, SCAN_INTERVAL};
use duepi_evo::ConnectionParams;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoveSrvError};

pub const SERVICE_NAME: &str = "stovesrv";
pub const DEFAULT_API_PORT: u16 = 6010;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoveSection {
    pub host: String,
    pub port: u16,
    pub device_code: String,
    pub connect_timeout_ms: u64,
    pub io_timeout_ms: u64,
    pub handshake_delay_ms: u64,
    pub command_delay_ms: u64,
}

impl Default for StoveSection {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            device_code: String::new(),
            connect_timeout_ms: 5000,
            io_timeout_ms: 5000,
            handshake_delay_ms: 500,
            command_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSection {
    pub interval_secs: u64,
    /// Abandon a poll that runs longer than this; unbounded when unset
    pub poll_timeout_secs: Option<u64>,
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            interval_secs: SCAN_INTERVAL.as_secs(),
            poll_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub enabled: bool,
    pub bind_address: String,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: format!("0.0.0.0:{}", DEFAULT_API_PORT),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Daily-rolling log files go here; console only when unset
    pub dir: Option<PathBuf>,
    pub json: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoveSrvConfig {
    pub stove: StoveSection,
    pub polling: PollingSection,
    pub api: ApiSection,
    pub logging: LoggingSection,
}

impl StoveSrvConfig {
    /// Load, then validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = common::load_config(SERVICE_NAME, path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let code = &self.stove.device_code;
        if code.is_empty() {
            return Err(StoveSrvError::config("stove.device_code is required"));
        }
        if !code.is_ascii() || code.contains('#') || code.chars().any(char::is_whitespace) {
            return Err(StoveSrvError::config(format!(
                "stove.device_code must be printable ASCII without '#': {:?}",
                code
            )));
        }
        if self.stove.host.trim().is_empty() {
            return Err(StoveSrvError::config("stove.host must not be empty"));
        }
        if self.stove.port == 0 {
            return Err(StoveSrvError::config("stove.port must not be 0"));
        }
        if self.stove.connect_timeout_ms == 0 || self.stove.io_timeout_ms == 0 {
            return Err(StoveSrvError::config("stove timeouts must be positive"));
        }
        if self.polling.interval_secs == 0 {
            return Err(StoveSrvError::config(
                "polling.interval_secs must be at least 1",
            ));
        }
        if self.polling.poll_timeout_secs == Some(0) {
            return Err(StoveSrvError::config(
                "polling.poll_timeout_secs must be positive when set",
            ));
        }
        if self.api.enabled {
            self.api_bind_address()?;
        }
        Ok(())
    }

    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams {
            connect_timeout: Duration::from_millis(self.stove.connect_timeout_ms),
            io_timeout: Duration::from_millis(self.stove.io_timeout_ms),
            handshake_delay: Duration::from_millis(self.stove.handshake_delay_ms),
            command_delay: Duration::from_millis(self.stove.command_delay_ms),
            ..ConnectionParams::new(
                self.stove.host.clone(),
                self.stove.port,
                self.stove.device_code.clone(),
            )
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_secs)
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        self.polling.poll_timeout_secs.map(Duration::from_secs)
    }

    pub fn api_bind_address(&self) -> Result<SocketAddr> {
        self.api.bind_address.parse().map_err(|e| {
            StoveSrvError::config(format!(
                "Invalid api.bind_address '{}': {}",
                self.api.bind_address, e
            ))
        })
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn valid() -> StoveSrvConfig {
        StoveSrvConfig {
            stove: StoveSection {
                device_code: "ABC123".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    // ========================================================================
    // Defaults Tests
    // ========================================================================

    #[test]
    fn test_defaults_match_protocol() {
        let config = valid();
        assert_eq!(config.stove.host, "duepiwebserver2.com");
        assert_eq!(config.stove.port, 3000);
        assert_eq!(config.poll_interval(), Duration::from_secs(12));
        assert_eq!(config.poll_timeout(), None);
        assert!(config.api.enabled);

        let params = config.connection_params();
        assert_eq!(params, ConnectionParams::for_device("ABC123"));
    }

    // ========================================================================
    // Validation Tests
    // ========================================================================

    #[test]
    fn test_missing_device_code_is_rejected() {
        let err = StoveSrvConfig::default().validate().unwrap_err();
        assert!(matches!(err, StoveSrvError::ConfigError(msg) if msg.contains("device_code")));
    }

    #[test]
    fn test_device_code_with_delimiter_is_rejected() {
        let mut config = valid();
        config.stove.device_code = "AB#12".to_string();
        assert!(config.validate().is_err());

        config.stove.device_code = "AB 12".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_and_port_are_rejected() {
        let mut config = valid();
        config.polling.interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.stove.port = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.polling.poll_timeout_secs = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_bind_address_only_matters_when_api_enabled() {
        let mut config = valid();
        config.api.bind_address = "not-an-address".to_string();
        assert!(config.validate().is_err());

        config.api.enabled = false;
        assert!(config.validate().is_ok());
    }

    // ========================================================================
    // Loading Tests
    // ========================================================================

    #[test]
    fn test_load_from_yaml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stovesrv.yaml");
        std::fs::write(
            &path,
            r#"
stove:
  host: 192.168.1.50
  device_code: "KALOR01"
  command_delay_ms: 250
polling:
  interval_secs: 30
  poll_timeout_secs: 20
api:
  bind_address: "127.0.0.1:7000"
"#,
        )
        .unwrap();

        let config = StoveSrvConfig::load(Some(&path)).unwrap();
        assert_eq!(config.stove.host, "192.168.1.50");
        assert_eq!(config.stove.port, 3000);
        assert_eq!(config.stove.device_code, "KALOR01");
        assert_eq!(
            config.connection_params().command_delay,
            Duration::from_millis(250)
        );
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.poll_timeout(), Some(Duration::from_secs(20)));
        assert_eq!(
            config.api_bind_address().unwrap(),
            "127.0.0.1:7000".parse().unwrap()
        );
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stovesrv.yaml");
        std::fs::write(&path, "stove:\n  host: stove.local\n").unwrap();

        let err = StoveSrvConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, StoveSrvError::ConfigError(_)));
    }
}
