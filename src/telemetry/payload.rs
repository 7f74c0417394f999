//! Outbound status message

use crate::core::Fix;
use crate::geofence::{Evaluation, GeofenceStatus};
use serde::{Deserialize, Serialize};

/// Timestamp layout used on the wire (UTC, no zone suffix)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// JSON status published once per tick with a valid fix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub timestamp: String,
    /// `[latitude, longitude, altitude_m]`
    pub coordinates: [f64; 3],
    pub geofence: GeofenceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

impl StatusPayload {
    pub fn new(fix: &Fix, evaluation: &Evaluation) -> Self {
        let timestamp = fix
            .timestamp_utc
            .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default();

        Self {
            timestamp,
            coordinates: [fix.latitude, fix.longitude, fix.altitude_m],
            geofence: evaluation.status,
            distance_m: evaluation.distance_m,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
