//! Core data types for the geofence tracker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Circular geofence: center in WGS-84 degrees and radius in meters.
///
/// The all-zero value is the "unset" sentinel; a radius of zero means
/// geofencing is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeofenceConfig {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub radius_m: u16,
}

impl GeofenceConfig {
    pub fn new(center_latitude: f64, center_longitude: f64, radius_m: u16) -> Self {
        Self {
            center_latitude,
            center_longitude,
            radius_m,
        }
    }

    /// The factory configuration: no geofence.
    pub fn unset() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.radius_m > 0
    }

    /// Coordinates are finite and within WGS-84 degree ranges.
    pub fn has_valid_center(&self) -> bool {
        self.center_latitude.is_finite()
            && self.center_longitude.is_finite()
            && (-90.0..=90.0).contains(&self.center_latitude)
            && (-180.0..=180.0).contains(&self.center_longitude)
    }
}

/// One GPS-derived position/time sample
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fix {
    pub timestamp_utc: Option<DateTime<Utc>>,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
    /// False until the receiver has reported a date
    pub valid: bool,
}

impl Fix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            timestamp_utc: None,
            latitude,
            longitude,
            altitude_m: 0.0,
            valid: true,
        }
    }

    pub fn with_altitude(mut self, altitude_m: f64) -> Self {
        self.altitude_m = altitude_m;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp_utc = Some(timestamp);
        self
    }

    /// A placeholder sample for the warm-up period.
    pub fn invalid() -> Self {
        Self::default()
    }
}
