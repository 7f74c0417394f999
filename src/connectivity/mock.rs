//! Mock broker transport for testing and development

use crate::connectivity::{
    BrokerTransport, Credentials, InboundMessage, TransportError, TransportResult,
};
use std::collections::VecDeque;

/// In-memory transport with scriptable failures
pub struct MockTransport {
    broker: String,
    connected: bool,
    refuse_remaining: u32,
    refuse_all: bool,
    fail_next_subscribe: bool,
    fail_publishes: bool,
    simulate_errors: bool,
    error_probability: f32,
    last_client_id: Option<String>,
    last_credentials: Option<Credentials>,
    inbound: VecDeque<InboundMessage>,
    subscriptions: Vec<String>,
    published: Vec<InboundMessage>,
    connect_attempts: u32,
    publish_attempts: u32,
    poll_count: u32,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::with_broker("mock://broker")
    }

    /// Create a mock reporting `broker` in its connect errors
    pub fn with_broker(broker: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            connected: false,
            refuse_remaining: 0,
            refuse_all: false,
            fail_next_subscribe: false,
            fail_publishes: false,
            simulate_errors: false,
            error_probability: 0.0,
            last_client_id: None,
            last_credentials: None,
            inbound: VecDeque::new(),
            subscriptions: Vec::new(),
            published: Vec::new(),
            connect_attempts: 0,
            publish_attempts: 0,
            poll_count: 0,
        }
    }

    /// Refuse the next `count` connect attempts
    pub fn refuse_connections(&mut self, count: u32) {
        self.refuse_remaining = count;
    }

    /// Refuse every connect attempt until turned off
    pub fn set_refuse_all(&mut self, refuse: bool) {
        self.refuse_all = refuse;
    }

    pub fn fail_next_subscribe(&mut self) {
        self.fail_next_subscribe = true;
    }

    pub fn set_fail_publishes(&mut self, fail: bool) {
        self.fail_publishes = fail;
    }

    /// Enable error simulation with given probability (0.0 to 1.0)
    pub fn simulate_errors(&mut self, enable: bool, probability: f32) {
        self.simulate_errors = enable;
        self.error_probability = probability.clamp(0.0, 1.0);
    }

    /// Simulate the broker dropping the session
    pub fn drop_connection(&mut self) {
        self.connected = false;
    }

    /// Queue a message for delivery on the next poll
    pub fn inject(&mut self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.inbound.push_back(InboundMessage::new(topic, payload));
    }

    /// Topics passed to successful subscribe calls, in order
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    pub fn published(&self) -> &[InboundMessage] {
        &self.published
    }

    pub fn clear_published(&mut self) {
        self.published.clear();
    }

    pub fn last_client_id(&self) -> Option<&str> {
        self.last_client_id.as_deref()
    }

    /// Credentials passed to the most recent connect attempt
    pub fn last_credentials(&self) -> Option<&Credentials> {
        self.last_credentials.as_ref()
    }

    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts
    }

    pub fn publish_attempts(&self) -> u32 {
        self.publish_attempts
    }

    pub fn poll_count(&self) -> u32 {
        self.poll_count
    }

    pub fn queued_message_count(&self) -> usize {
        self.inbound.len()
    }

    fn should_simulate_error(&self) -> bool {
        if !self.simulate_errors {
            return false;
        }

        use rand::Rng;
        let mut rng = rand::thread_rng();
        rng.gen::<f32>() < self.error_probability
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl BrokerTransport for MockTransport {
    fn connect(&mut self, client_id: &str, credentials: Option<&Credentials>) -> TransportResult<()> {
        self.connect_attempts += 1;
        self.last_client_id = Some(client_id.to_string());
        self.last_credentials = credentials.cloned();

        let refused = if self.refuse_remaining > 0 {
            self.refuse_remaining -= 1;
            true
        } else {
            self.refuse_all || self.should_simulate_error()
        };

        if refused {
            self.connected = false;
            return Err(TransportError::ConnectFailed {
                broker: self.broker.clone(),
                reason: "connection refused".to_string(),
            });
        }

        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn subscribe(&mut self, topic: &str) -> TransportResult<()> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        if self.fail_next_subscribe {
            self.fail_next_subscribe = false;
            return Err(TransportError::SubscribeFailed {
                topic: topic.to_string(),
                reason: "simulated failure".to_string(),
            });
        }

        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> TransportResult<()> {
        self.publish_attempts += 1;

        if !self.connected {
            return Err(TransportError::ConnectionLost);
        }

        if self.fail_publishes || self.should_simulate_error() {
            return Err(TransportError::PublishFailed {
                topic: topic.to_string(),
                reason: "simulated failure".to_string(),
            });
        }

        self.published.push(InboundMessage::new(topic, payload));
        Ok(())
    }

    fn poll(&mut self) -> TransportResult<Vec<InboundMessage>> {
        self.poll_count += 1;

        if !self.connected {
            return Err(TransportError::ConnectionLost);
        }

        Ok(self.inbound.drain(..).collect())
    }
}
