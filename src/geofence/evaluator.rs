//! Circular geofence membership test

use crate::core::{Fix, GeofenceConfig};
use crate::geofence::haversine_distance_m;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of checking a fix against the configured geofence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeofenceStatus {
    /// Strictly closer to the center than the radius
    Inside,
    /// On or beyond the boundary
    Outside,
    /// No geofence configured (radius 0)
    Disabled,
    /// The fix is not valid; membership is unknown
    NoFix,
}

impl GeofenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeofenceStatus::Inside => "inside",
            GeofenceStatus::Outside => "outside",
            GeofenceStatus::Disabled => "disabled",
            GeofenceStatus::NoFix => "no_fix",
        }
    }

    /// A real boundary violation, as opposed to disabled or unknown
    pub fn is_violation(&self) -> bool {
        matches!(self, GeofenceStatus::Outside)
    }
}

impl fmt::Display for GeofenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status together with the distance that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub status: GeofenceStatus,
    /// Distance from the center in meters; absent when disabled or without fix
    pub distance_m: Option<f64>,
}

/// Stateless geofence evaluator
#[derive(Debug, Clone, Copy, Default)]
pub struct GeofenceEvaluator;

impl GeofenceEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Classify `fix` against `config`
    pub fn check_inside(&self, config: &GeofenceConfig, fix: &Fix) -> GeofenceStatus {
        self.evaluate(config, fix).status
    }

    /// Classify `fix` against `config` and report the distance used
    pub fn evaluate(&self, config: &GeofenceConfig, fix: &Fix) -> Evaluation {
        if !fix.valid {
            return Evaluation {
                status: GeofenceStatus::NoFix,
                distance_m: None,
            };
        }

        if !config.is_enabled() {
            return Evaluation {
                status: GeofenceStatus::Disabled,
                distance_m: None,
            };
        }

        let distance = self.distance_m(config, fix);
        Evaluation {
            status: Self::classify(distance, config.radius_m),
            distance_m: Some(distance),
        }
    }

    /// Great-circle distance from the geofence center to the fix
    pub fn distance_m(&self, config: &GeofenceConfig, fix: &Fix) -> f64 {
        haversine_distance_m(
            config.center_latitude,
            config.center_longitude,
            fix.latitude,
            fix.longitude,
        )
    }

    /// Boundary-exclusive comparison: `distance == radius` is outside
    pub fn classify(distance_m: f64, radius_m: u16) -> GeofenceStatus {
        if radius_m == 0 {
            GeofenceStatus::Disabled
        } else if distance_m < radius_m as f64 {
            GeofenceStatus::Inside
        } else {
            GeofenceStatus::Outside
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// A zero radius never reports a violation, wherever the fix is.
        #[test]
        fn zero_radius_always_disabled(
            clat in -90.0f64..=90.0, clon in -180.0f64..=180.0,
            lat in -90.0f64..=90.0, lon in -180.0f64..=180.0,
        ) {
            let config = GeofenceConfig::new(clat, clon, 0);
            let status = GeofenceEvaluator::new().check_inside(&config, &Fix::new(lat, lon));
            prop_assert_eq!(status, GeofenceStatus::Disabled);
        }

        /// The center itself is inside any enabled geofence.
        #[test]
        fn center_always_inside(
            clat in -90.0f64..=90.0, clon in -180.0f64..=180.0, radius in 1u16..=u16::MAX,
        ) {
            let config = GeofenceConfig::new(clat, clon, radius);
            let status = GeofenceEvaluator::new().check_inside(&config, &Fix::new(clat, clon));
            prop_assert_eq!(status, GeofenceStatus::Inside);
        }

        /// A distance equal to the radius is always outside.
        #[test]
        fn boundary_always_outside(radius in 1u16..=u16::MAX) {
            prop_assert_eq!(
                GeofenceEvaluator::classify(radius as f64, radius),
                GeofenceStatus::Outside
            );
        }
    }
}
