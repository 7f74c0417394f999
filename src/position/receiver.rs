//! GPS decoder capability

use crate::position::GpsResult;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Last state decoded from the receiver's sentence stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiverState {
    /// Absent until the receiver has reported a date
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub altitude_m: f64,
}

impl ReceiverState {
    pub fn new(latitude: f64, longitude: f64, altitude_m: f64) -> Self {
        Self {
            date: None,
            time: None,
            latitude,
            longitude,
            altitude_m,
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_time(mut self, time: NaiveTime) -> Self {
        self.time = Some(time);
        self
    }
}

/// A GPS receiver with an attached sentence decoder
pub trait GpsReceiver {
    /// Feed every pending byte to the decoder.
    /// Returns Ok(true) if any new data was consumed.
    fn process_pending(&mut self) -> GpsResult<bool>;

    /// Last decoded state
    fn state(&self) -> &ReceiverState;
}
