//! GPS Geofence Tracker
//!
//! Periodic location telemetry: GPS fixes are checked against a persistently
//! stored circular geofence and reported over a publish/subscribe link, and
//! the geofence can be replaced remotely by an inbound message.

pub mod core;
pub mod storage;
pub mod geofence;
pub mod position;
pub mod connectivity;
pub mod telemetry;
pub mod utils;

// Re-export commonly used types
pub use crate::core::{Fix, GeofenceConfig, EARTH_RADIUS_M};
pub use storage::{
    NvStorage, MemoryStorage, FileStorage, PersistentConfigStore, StorageError, StorageResult,
};
pub use geofence::{haversine_distance_m, Evaluation, GeofenceEvaluator, GeofenceStatus};
pub use position::{
    GpsReceiver, ReceiverState, PositionSource, MockGpsReceiver, ReplayGpsReceiver, GpsError,
    GpsResult,
};
pub use connectivity::{
    BrokerTransport, Credentials, InboundMessage, Topic, Clock, SystemClock, ManualClock, ConnectivityManager,
    ConnectivityConfig, ConnectionState, ConnectivityEvent, MockTransport, ConsoleTransport,
    TransportError, TransportResult,
};
pub use telemetry::{CommandError, GeofenceCommand, StatusPayload, TelemetryLoop, TelemetryStats};
pub use utils::{DeviceConfig, ConfigError};
