//! Device configuration and logging setup

pub mod config;
pub mod logging;

pub use config::{BrokerConfig, ConfigError, DeviceConfig, TransportKind};
pub use logging::{init_logging, LoggingError};
