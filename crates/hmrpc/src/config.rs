//! Gateway connection settings.
//!
//! Loaded from JSON with camelCase keys. Only `gatewayAddress` is required;
//! every other field falls back to the stock CCU defaults.

use std::path::Path;
use std::time::Duration;

use hmrpc_types::Interface;
use serde::{Deserialize, Serialize};

use crate::charset::Charset;

pub const DEFAULT_RF_PORT: u16 = 2001;
pub const DEFAULT_WIRED_PORT: u16 = 2000;
pub const DEFAULT_HMIP_PORT: u16 = 2010;
pub const DEFAULT_CUXD_PORT: u16 = 8701;
pub const DEFAULT_GROUP_PORT: u16 = 9292;

pub const DEFAULT_BIN_CALLBACK_PORT: u16 = 9126;
pub const DEFAULT_XML_CALLBACK_PORT: u16 = 9125;

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Errors raised while loading or validating a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Overrides gateway type detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayType {
    #[default]
    Auto,
    /// Treat the gateway as a CCU even if detection says otherwise
    Ccu,
    /// Never treat the gateway as a CCU
    NoCcu,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Host name or IP of the CCU/Homegear
    pub gateway_address: String,

    /// Address the gateway uses to reach our callback servers
    #[serde(default = "default_callback_host")]
    pub callback_host: String,

    #[serde(default = "default_bin_callback_port")]
    pub bin_callback_port: u16,

    #[serde(default = "default_xml_callback_port")]
    pub xml_callback_port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rf_port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wired_port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hmip_port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuxd_port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_port: Option<u16>,

    /// Connect, read and write timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub encoding: Charset,

    #[serde(default)]
    pub gateway_type: GatewayType,
}

fn default_callback_host() -> String {
    "127.0.0.1".to_string()
}

fn default_bin_callback_port() -> u16 {
    DEFAULT_BIN_CALLBACK_PORT
}

fn default_xml_callback_port() -> u16 {
    DEFAULT_XML_CALLBACK_PORT
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl GatewayConfig {
    /// Configuration with defaults for everything but the gateway host.
    #[must_use]
    pub fn new(gateway_address: impl Into<String>) -> Self {
        Self {
            gateway_address: gateway_address.into(),
            callback_host: default_callback_host(),
            bin_callback_port: DEFAULT_BIN_CALLBACK_PORT,
            xml_callback_port: DEFAULT_XML_CALLBACK_PORT,
            rf_port: None,
            wired_port: None,
            hmip_port: None,
            cuxd_port: None,
            group_port: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            encoding: Charset::default(),
            gateway_type: GatewayType::default(),
        }
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for an empty host, a zero port or a
    /// zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway_address.trim().is_empty() {
            return Err(ConfigError::Invalid("gatewayAddress is empty".to_string()));
        }
        if self.callback_host.trim().is_empty() {
            return Err(ConfigError::Invalid("callbackHost is empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeoutSecs must be positive".to_string()));
        }
        if self.bin_callback_port == 0 || self.xml_callback_port == 0 {
            return Err(ConfigError::Invalid("callback ports must be non-zero".to_string()));
        }
        for interface in Interface::ALL {
            if self.port(interface) == 0 {
                return Err(ConfigError::Invalid(format!("{interface} port must be non-zero")));
            }
        }
        Ok(())
    }

    fn configured_port(&self, interface: Interface) -> Option<u16> {
        match interface {
            Interface::Rf => self.rf_port,
            Interface::Wired => self.wired_port,
            Interface::Hmip => self.hmip_port,
            Interface::Cuxd => self.cuxd_port,
            Interface::Group => self.group_port,
        }
    }

    /// Destination port of an interface.
    #[must_use]
    pub fn port(&self, interface: Interface) -> u16 {
        self.configured_port(interface).unwrap_or(match interface {
            Interface::Rf => DEFAULT_RF_PORT,
            Interface::Wired => DEFAULT_WIRED_PORT,
            Interface::Hmip => DEFAULT_HMIP_PORT,
            Interface::Cuxd => DEFAULT_CUXD_PORT,
            Interface::Group => DEFAULT_GROUP_PORT,
        })
    }

    /// Whether the port was configured explicitly.
    ///
    /// Non-CCU gateways only get probed on explicitly configured interfaces.
    #[must_use]
    pub fn has_port(&self, interface: Interface) -> bool {
        self.configured_port(interface).is_some()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn is_ccu_type(&self) -> bool {
        self.gateway_type == GatewayType::Ccu
    }

    #[must_use]
    pub fn is_no_ccu_type(&self) -> bool {
        self.gateway_type == GatewayType::NoCcu
    }
}
