//! Connection state machine with bounded retry

use crate::connectivity::{
    BrokerTransport, Clock, Credentials, InboundMessage, SystemClock, Topic, TransportError, TransportResult,
};
use crate::core::{DEFAULT_RETRY_BACKOFF_MS, DEFAULT_RETRY_BUDGET};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Callback invoked for every inbound message on the subscribed topic
pub type MessageCallback = Box<dyn FnMut(&InboundMessage)>;

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    /// Retry cycle in progress
    Connecting,
    Connected,
    /// Retry budget spent; idle until reset
    RetryExhausted,
}

/// Notable outcome of a [`ConnectivityManager::handle`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    None,
    Connected,
    RetryExhausted,
}

/// Connection parameters
#[derive(Debug, Clone)]
pub struct ConnectivityConfig {
    pub client_id: String,
    /// Broker login; anonymous when absent
    pub credentials: Option<Credentials>,
    /// Consecutive failed connects allowed before giving up
    pub retry_budget: u8,
    pub retry_backoff: Duration,
    /// Sleep through the backoff inside `handle` instead of returning early
    pub blocking_backoff: bool,
}

impl ConnectivityConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            credentials: None,
            retry_budget: DEFAULT_RETRY_BUDGET,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            blocking_backoff: false,
        }
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_retry_budget(mut self, budget: u8) -> Self {
        self.retry_budget = budget;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_blocking_backoff(mut self, blocking: bool) -> Self {
        self.blocking_backoff = blocking;
        self
    }
}

/// Counters kept by the manager
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectivityStats {
    pub connect_attempts: u64,
    pub connect_failures: u64,
    pub connections: u64,
    pub connection_losses: u64,
    pub publishes: u64,
    pub publish_failures: u64,
    pub inbound_messages: u64,
    pub ignored_messages: u64,
}

/// Drives a [`BrokerTransport`] through connect, subscribe and retry.
///
/// Each [`handle`](Self::handle) call makes at most one connect attempt.
/// After a failure the next attempt is held back until the backoff deadline
/// has passed; after `retry_budget` consecutive failures the manager stops
/// trying until [`reset`](Self::reset).
pub struct ConnectivityManager<T: BrokerTransport, C: Clock = SystemClock> {
    transport: T,
    clock: C,
    config: ConnectivityConfig,
    state: ConnectionState,
    retries_left: u8,
    retry_at: Option<Instant>,
    subscription: Option<Topic>,
    subscribed: bool,
    on_message: Option<MessageCallback>,
    stats: ConnectivityStats,
}

impl<T: BrokerTransport> ConnectivityManager<T, SystemClock> {
    pub fn new(transport: T, config: ConnectivityConfig) -> Self {
        Self::with_clock(transport, config, SystemClock)
    }
}

impl<T: BrokerTransport, C: Clock> ConnectivityManager<T, C> {
    pub fn with_clock(transport: T, config: ConnectivityConfig, clock: C) -> Self {
        let retries_left = config.retry_budget;
        Self {
            transport,
            clock,
            config,
            state: ConnectionState::Disconnected,
            retries_left,
            retry_at: None,
            subscription: None,
            subscribed: false,
            on_message: None,
            stats: ConnectivityStats::default(),
        }
    }

    /// Maintain the connection; call once per cadence tick.
    pub fn handle(&mut self) -> ConnectivityEvent {
        match self.state {
            ConnectionState::RetryExhausted => return ConnectivityEvent::None,
            ConnectionState::Connected => {
                if self.transport.is_connected() {
                    self.service();
                    return ConnectivityEvent::None;
                }
                warn!("Broker connection lost");
                self.mark_disconnected();
            }
            ConnectionState::Disconnected | ConnectionState::Connecting => {}
        }

        if let Some(deadline) = self.retry_at {
            if self.clock.now() < deadline {
                return ConnectivityEvent::None;
            }
            self.retry_at = None;
        }

        self.attempt_connect()
    }

    fn attempt_connect(&mut self) -> ConnectivityEvent {
        self.state = ConnectionState::Connecting;
        self.stats.connect_attempts += 1;

        match self
            .transport
            .connect(&self.config.client_id, self.config.credentials.as_ref())
        {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                self.retries_left = self.config.retry_budget;
                self.stats.connections += 1;
                self.subscribed = false;
                info!(client_id = %self.config.client_id, "Connected to broker");

                self.service();
                ConnectivityEvent::Connected
            }
            Err(e) => {
                self.stats.connect_failures += 1;
                self.retries_left = self.retries_left.saturating_sub(1);

                if self.retries_left == 0 {
                    self.state = ConnectionState::RetryExhausted;
                    warn!(error = %e, attempts = self.config.retry_budget, "Broker retry budget exhausted");
                    return ConnectivityEvent::RetryExhausted;
                }

                let deadline = self.clock.now() + self.config.retry_backoff;
                warn!(
                    error = %e,
                    retries_left = self.retries_left,
                    backoff_ms = self.config.retry_backoff.as_millis() as u64,
                    "Broker connect failed"
                );

                if self.config.blocking_backoff {
                    self.clock.sleep_until(deadline);
                } else {
                    self.retry_at = Some(deadline);
                }
                ConnectivityEvent::None
            }
        }
    }

    /// Re-issue the subscription if needed, then run the transport's tick
    fn service(&mut self) {
        if !self.subscribed {
            if let Some(topic) = &self.subscription {
                match self.transport.subscribe(topic.as_str()) {
                    Ok(()) => {
                        self.subscribed = true;
                        debug!(topic = %topic, "Subscribed");
                    }
                    Err(e) => warn!(topic = %topic, error = %e, "Subscribe failed"),
                }
            }
        }

        let messages = match self.transport.poll() {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, "Transport maintenance failed");
                if !self.transport.is_connected() {
                    self.mark_disconnected();
                }
                return;
            }
        };

        for message in messages {
            let wanted = self
                .subscription
                .as_ref()
                .map_or(false, |filter| filter.matches(&message.topic));

            if !wanted {
                self.stats.ignored_messages += 1;
                debug!(topic = %message.topic, "Ignoring message outside subscription");
                continue;
            }

            self.stats.inbound_messages += 1;
            if let Some(callback) = self.on_message.as_mut() {
                callback(&message);
            }
        }
    }

    fn mark_disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.subscribed = false;
        self.stats.connection_losses += 1;
    }

    /// Publish once; failures are reported, never queued
    pub fn publish(&mut self, topic: &Topic, payload: &[u8]) -> TransportResult<()> {
        if topic.is_filter() {
            return Err(TransportError::InvalidTopic {
                reason: format!("cannot publish to filter '{}'", topic),
            });
        }

        if self.state != ConnectionState::Connected {
            self.stats.publish_failures += 1;
            return Err(TransportError::NotConnected);
        }

        match self.transport.publish(topic.as_str(), payload) {
            Ok(()) => {
                self.stats.publishes += 1;
                debug!(topic = %topic, bytes = payload.len(), "Published");
                Ok(())
            }
            Err(e) => {
                self.stats.publish_failures += 1;
                if !self.transport.is_connected() {
                    self.mark_disconnected();
                }
                Err(e)
            }
        }
    }

    /// Record the topic to (re-)subscribe to on every connection
    pub fn subscribe(&mut self, topic: Topic) {
        self.subscription = Some(topic);
        self.subscribed = false;

        if self.state == ConnectionState::Connected {
            if let Some(topic) = &self.subscription {
                match self.transport.subscribe(topic.as_str()) {
                    Ok(()) => self.subscribed = true,
                    Err(e) => warn!(topic = %topic, error = %e, "Subscribe failed"),
                }
            }
        }
    }

    /// Register the inbound message callback, replacing any previous one
    pub fn set_message_callback(&mut self, callback: MessageCallback) {
        self.on_message = Some(callback);
    }

    /// Restore the retry budget; leaves RetryExhausted for Disconnected
    pub fn reset(&mut self) {
        self.retries_left = self.config.retry_budget;
        self.retry_at = None;
        if self.state == ConnectionState::RetryExhausted {
            self.state = ConnectionState::Disconnected;
            info!("Connectivity reset, retrying on next tick");
        }
    }

    /// Close the session deliberately
    pub fn disconnect(&mut self) {
        self.transport.disconnect();
        self.state = ConnectionState::Disconnected;
        self.subscribed = false;
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn retries_left(&self) -> u8 {
        self.retries_left
    }

    /// Earliest time the next connect attempt will be made
    pub fn retry_deadline(&self) -> Option<Instant> {
        self.retry_at
    }

    pub fn subscription(&self) -> Option<&Topic> {
        self.subscription.as_ref()
    }

    pub fn stats(&self) -> &ConnectivityStats {
        &self.stats
    }

    pub fn config(&self) -> &ConnectivityConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
