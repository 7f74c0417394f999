//! Broker transport error types

use thiserror::Error;

/// Errors raised by broker transports and the connectivity manager
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// Broker refused or could not be reached
    #[error("Connection to {broker} failed: {reason}")]
    ConnectFailed { broker: String, reason: String },
    /// Operation needs an established session
    #[error("Not connected to broker")]
    NotConnected,
    /// Session dropped while in use
    #[error("Connection to broker lost")]
    ConnectionLost,
    #[error("Publish to '{topic}' failed: {reason}")]
    PublishFailed { topic: String, reason: String },
    #[error("Subscribe to '{topic}' failed: {reason}")]
    SubscribeFailed { topic: String, reason: String },
    #[error("Invalid topic: {reason}")]
    InvalidTopic { reason: String },
    #[error("Transport I/O error: {details}")]
    Io { details: String },
}

impl TransportError {
    /// Whether the failure may clear up on a later attempt
    pub fn is_transient(&self) -> bool {
        !matches!(self, TransportError::InvalidTopic { .. })
    }
}

pub type TransportResult<T> = Result<T, TransportError>;
