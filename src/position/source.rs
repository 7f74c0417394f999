//! Fix validity and accessors over a GPS receiver

use crate::core::Fix;
use crate::position::GpsReceiver;
use chrono::{DateTime, NaiveTime, Utc};
use tracing::{debug, warn};

/// Wraps a [`GpsReceiver`] and exposes "do we have a usable fix".
///
/// A fix is usable once the receiver has reported a date; until then the
/// receiver is still warming up and coordinates are meaningless.
pub struct PositionSource<R: GpsReceiver> {
    receiver: R,
    polls: u64,
    link_errors: u64,
}

impl<R: GpsReceiver> PositionSource<R> {
    pub fn new(receiver: R) -> Self {
        Self {
            receiver,
            polls: 0,
            link_errors: 0,
        }
    }

    /// Consume pending receiver data.
    ///
    /// Returns true when new data was consumed and a fix is available.
    pub fn poll(&mut self) -> bool {
        self.polls += 1;

        let consumed = match self.receiver.process_pending() {
            Ok(consumed) => consumed,
            Err(e) => {
                self.link_errors += 1;
                warn!(error = %e, "GPS receiver error");
                false
            }
        };

        if !self.has_fix() {
            debug!(consumed, "GPS warming up, no date yet");
            return false;
        }

        consumed
    }

    pub fn has_fix(&self) -> bool {
        self.receiver.state().date.is_some()
    }

    pub fn latitude(&self) -> f64 {
        self.receiver.state().latitude
    }

    pub fn longitude(&self) -> f64 {
        self.receiver.state().longitude
    }

    pub fn altitude_m(&self) -> f64 {
        self.receiver.state().altitude_m
    }

    /// UTC timestamp of the last decoded sample
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let state = self.receiver.state();
        let date = state.date?;
        let time = state.time.unwrap_or(NaiveTime::MIN);
        Some(date.and_time(time).and_utc())
    }

    /// Snapshot the current sample as a [`Fix`]
    pub fn fix(&self) -> Fix {
        Fix {
            timestamp_utc: self.timestamp(),
            latitude: self.latitude(),
            longitude: self.longitude(),
            altitude_m: self.altitude_m(),
            valid: self.has_fix(),
        }
    }

    pub fn link_errors(&self) -> u64 {
        self.link_errors
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }

    pub fn receiver(&self) -> &R {
        &self.receiver
    }

    pub fn receiver_mut(&mut self) -> &mut R {
        &mut self.receiver
    }
}
