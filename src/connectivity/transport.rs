//! Pub/sub transport capability

use crate::connectivity::TransportResult;
use std::borrow::Cow;
use std::fmt;

/// A message delivered by the broker
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    pub fn payload_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Broker login; the password is never printed
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: Option<String>) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Session-level access to a publish/subscribe broker.
///
/// Plain and TLS links are separate implementations chosen when the
/// manager is constructed.
pub trait BrokerTransport {
    /// Open a session identified by `client_id`; anonymous without credentials
    fn connect(&mut self, client_id: &str, credentials: Option<&Credentials>) -> TransportResult<()>;

    /// Close the session, if any
    fn disconnect(&mut self);

    /// Whether the session is currently established
    fn is_connected(&self) -> bool;

    fn subscribe(&mut self, topic: &str) -> TransportResult<()>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> TransportResult<()>;

    /// Maintenance tick: keepalive and collection of inbound messages
    fn poll(&mut self) -> TransportResult<Vec<InboundMessage>>;
}

impl<T: BrokerTransport + ?Sized> BrokerTransport for Box<T> {
    fn connect(&mut self, client_id: &str, credentials: Option<&Credentials>) -> TransportResult<()> {
        (**self).connect(client_id, credentials)
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn subscribe(&mut self, topic: &str) -> TransportResult<()> {
        (**self).subscribe(topic)
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> TransportResult<()> {
        (**self).publish(topic, payload)
    }

    fn poll(&mut self) -> TransportResult<Vec<InboundMessage>> {
        (**self).poll()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_hides_password() {
        let credentials = Credentials::new("tracker", Some("s3cret".to_string()));
        let printed = format!("{:?}", credentials);
        assert!(printed.contains("tracker"));
        assert!(!printed.contains("s3cret"));
    }
}
