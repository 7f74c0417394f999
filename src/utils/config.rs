//! Device configuration file loading and validation

use crate::connectivity::{ConnectivityConfig, Credentials, Topic};
use crate::core::{
    DEFAULT_APP_NAME, DEFAULT_BROKER_PORT, DEFAULT_RETRY_BACKOFF_MS, DEFAULT_RETRY_BUDGET,
    DEFAULT_TOPIC_NAMESPACE, DEFAULT_TX_INTERVAL_MS,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Configuration loading and validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Invalid parameter value
    #[error("Invalid {parameter} '{value}': {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
    /// Configuration file I/O error
    #[error("{message}")]
    Io { message: String },
    /// JSON serialization/deserialization error
    #[error("{message}")]
    Serialization { message: String },
}

impl ConfigError {
    fn invalid(parameter: &str, value: impl ToString, reason: &str) -> Self {
        ConfigError::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Link security between device and broker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Plain,
    Tls,
}

impl TransportKind {
    pub fn scheme(&self) -> &'static str {
        match self {
            TransportKind::Plain => "mqtt",
            TransportKind::Tls => "mqtts",
        }
    }
}

/// Broker endpoint and credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub transport: TransportKind,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_BROKER_PORT,
            username: None,
            password: None,
            transport: TransportKind::Plain,
        }
    }
}

impl BrokerConfig {
    /// `mqtt://host:port` or `mqtts://host:port`
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.transport.scheme(), self.host, self.port)
    }

    /// Login for the broker; an empty or missing username connects anonymously
    pub fn credentials(&self) -> Option<Credentials> {
        self.username
            .as_deref()
            .filter(|username| !username.is_empty())
            .map(|username| Credentials::new(username, self.password.clone()))
    }
}

/// Device-wide settings, constructed once at startup and passed by reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Application name reported in logs
    pub app_name: String,
    /// Broker client id and middle topic level
    pub device_id: String,
    pub broker: BrokerConfig,
    /// First topic level
    pub topic_namespace: String,
    /// Telemetry cadence (milliseconds)
    pub tx_interval_ms: u64,
    /// Consecutive failed connects before giving up
    pub retry_budget: u8,
    /// Wait between connect attempts (milliseconds)
    pub retry_backoff_ms: u64,
    /// Sleep through the backoff instead of deferring the next attempt
    pub blocking_backoff: bool,
    /// Byte offset of the geofence record in non-volatile storage
    pub storage_base_offset: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            device_id: "device".to_string(),
            broker: BrokerConfig::default(),
            topic_namespace: DEFAULT_TOPIC_NAMESPACE.to_string(),
            tx_interval_ms: DEFAULT_TX_INTERVAL_MS,
            retry_budget: DEFAULT_RETRY_BUDGET,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            blocking_backoff: false,
            storage_base_offset: 0,
        }
    }
}

impl DeviceConfig {
    /// Read and validate a JSON configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let config = Self::from_json(&content).map_err(|e| match e {
            ConfigError::Serialization { message } => ConfigError::Serialization {
                message: format!("Failed to parse config file '{}': {}", path_str, message),
            },
            other => other,
        })?;

        info!(path = %path_str, device_id = %config.device_id, "Loaded device configuration");
        Ok(config)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: DeviceConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Serialization {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialization {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(&path, json).map_err(|e| ConfigError::Io {
            message: format!("Failed to write config file '{}': {}", path_str, e),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_id.trim().is_empty() {
            return Err(ConfigError::invalid("device_id", &self.device_id, "must not be empty"));
        }

        if self.device_id.contains(['/', '+', '#']) {
            return Err(ConfigError::invalid(
                "device_id",
                &self.device_id,
                "must not contain topic separators or wildcards",
            ));
        }

        if self.topic_namespace.contains(['+', '#']) {
            return Err(ConfigError::invalid(
                "topic_namespace",
                &self.topic_namespace,
                "must not contain wildcards",
            ));
        }

        if self.broker.host.trim().is_empty() {
            return Err(ConfigError::invalid("broker.host", &self.broker.host, "must not be empty"));
        }

        if self.broker.port == 0 {
            return Err(ConfigError::invalid("broker.port", self.broker.port, "must be non-zero"));
        }

        if self.retry_budget == 0 {
            return Err(ConfigError::invalid("retry_budget", self.retry_budget, "must be at least 1"));
        }

        if self.tx_interval_ms == 0 {
            return Err(ConfigError::invalid("tx_interval_ms", self.tx_interval_ms, "must be non-zero"));
        }

        // Topic length limits
        self.status_topic()?;
        self.geofence_topic()?;

        Ok(())
    }

    /// `<namespace>/<device_id>/status`
    pub fn status_topic(&self) -> Result<Topic, ConfigError> {
        self.topic("status")
    }

    /// `<namespace>/<device_id>/geofence/set`
    pub fn geofence_topic(&self) -> Result<Topic, ConfigError> {
        self.topic("geofence/set")
    }

    fn topic(&self, suffix: &str) -> Result<Topic, ConfigError> {
        let name = format!("{}/{}/{}", self.topic_namespace, self.device_id, suffix);
        Topic::new(name.clone()).map_err(|e| ConfigError::invalid("topic", name, &e.to_string()))
    }

    pub fn tx_interval(&self) -> Duration {
        Duration::from_millis(self.tx_interval_ms)
    }

    /// Connection parameters for the connectivity manager
    pub fn connectivity_config(&self) -> ConnectivityConfig {
        ConnectivityConfig::new(self.device_id.clone())
            .with_credentials(self.broker.credentials())
            .with_retry_budget(self.retry_budget)
            .with_retry_backoff(Duration::from_millis(self.retry_backoff_ms))
            .with_blocking_backoff(self.blocking_backoff)
    }
}
