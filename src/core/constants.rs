//! Physical constants and device defaults

/// Mean Earth radius used for great-circle distances (meters)
pub const EARTH_RADIUS_M: f64 = 6_372_795.0;

/// Application name reported by default
pub const DEFAULT_APP_NAME: &str = "mqtt-gps";

/// Default topic namespace shared by inbound and outbound topics
pub const DEFAULT_TOPIC_NAMESPACE: &str = "mqtt-gps";

/// Default broker port (plain MQTT)
pub const DEFAULT_BROKER_PORT: u16 = 1883;

/// Default transmission cadence (milliseconds)
pub const DEFAULT_TX_INTERVAL_MS: u64 = 30_000;

/// Consecutive connect attempts permitted before giving up for the cycle
pub const DEFAULT_RETRY_BUDGET: u8 = 6;

/// Wait between two connect attempts (milliseconds)
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 5_000;

/// Longest topic the MQTT wire format can carry (bytes)
pub const MAX_TOPIC_LENGTH: usize = 65_535;
