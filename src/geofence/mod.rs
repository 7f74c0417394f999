//! Geofence evaluation

pub mod distance;
pub mod evaluator;

pub use distance::haversine_distance_m;
pub use evaluator::{GeofenceEvaluator, GeofenceStatus, Evaluation};
