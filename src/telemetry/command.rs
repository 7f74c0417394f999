//! Remote geofence reconfiguration

use crate::core::GeofenceConfig;
use crate::storage::StorageError;
use serde::Deserialize;
use thiserror::Error;

/// Why an inbound reconfiguration was not applied
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("Payload is not valid UTF-8")]
    NotUtf8,
    #[error("Expected 3 comma-separated fields, found {found}")]
    FieldCount { found: usize },
    #[error("Invalid {field} '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("Malformed JSON command: {details}")]
    Json { details: String },
    #[error("Radius {value} does not fit in 0..=65535 meters")]
    RadiusOutOfRange { value: i64 },
    #[error("Center ({latitude}, {longitude}) is outside WGS-84 range")]
    InvalidCenter { latitude: f64, longitude: f64 },
    #[error("Failed to persist geofence: {0}")]
    Storage(#[from] StorageError),
}

/// A parsed "set geofence" request.
///
/// Accepted forms: `"<lat>,<lon>,<radius>"` and
/// `{"latitude": .., "longitude": .., "radius": ..}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceCommand {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: u16,
}

#[derive(Deserialize)]
struct JsonCommand {
    latitude: f64,
    longitude: f64,
    radius: i64,
}

impl GeofenceCommand {
    pub fn parse(payload: &[u8]) -> Result<Self, CommandError> {
        let text = std::str::from_utf8(payload).map_err(|_| CommandError::NotUtf8)?;
        let text = text.trim();

        let (latitude, longitude, radius) = if text.starts_with('{') {
            let raw: JsonCommand = serde_json::from_str(text).map_err(|e| CommandError::Json {
                details: e.to_string(),
            })?;
            (raw.latitude, raw.longitude, raw.radius)
        } else {
            let fields: Vec<&str> = text.split(',').map(str::trim).collect();
            if fields.len() != 3 {
                return Err(CommandError::FieldCount { found: fields.len() });
            }
            (
                parse_field("latitude", fields[0])?,
                parse_field("longitude", fields[1])?,
                parse_field("radius", fields[2])?,
            )
        };

        let radius_m = u16::try_from(radius)
            .map_err(|_| CommandError::RadiusOutOfRange { value: radius })?;

        let command = Self {
            latitude,
            longitude,
            radius_m,
        };

        if !command.config().has_valid_center() {
            return Err(CommandError::InvalidCenter {
                latitude,
                longitude,
            });
        }

        Ok(command)
    }

    pub fn config(&self) -> GeofenceConfig {
        GeofenceConfig::new(self.latitude, self.longitude, self.radius_m)
    }
}

fn parse_field<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, CommandError> {
    value.parse().map_err(|_| CommandError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}
