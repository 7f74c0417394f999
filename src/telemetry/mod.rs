//! Status reporting and remote reconfiguration

pub mod command;
pub mod payload;
pub mod telemetry_loop;

pub use command::{CommandError, GeofenceCommand};
pub use payload::{StatusPayload, TIMESTAMP_FORMAT};
pub use telemetry_loop::{TelemetryLoop, TelemetryStats, TickReport};
