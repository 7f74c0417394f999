//! GPS receiver error types

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GpsError {
    /// Reading from the receiver link failed
    #[error("GPS link error: {details}")]
    Link { details: String },
    /// Receiver produced data that could not be decoded
    #[error("GPS decode error at record {record}: {details}")]
    Decode { record: u64, details: String },
}

pub type GpsResult<T> = Result<T, GpsError>;
