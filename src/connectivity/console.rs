//! Transport that prints publishes to a writer
//!
//! Stands in for a broker on a development host: every publish becomes a
//! `<topic> <payload>` line on the sink, and inbound messages are whatever
//! the caller queues with [`ConsoleTransport::inject`].

use crate::connectivity::{
    BrokerTransport, Credentials, InboundMessage, TransportError, TransportResult,
};
use std::collections::VecDeque;
use std::io::{self, Write};
use tracing::info;

pub struct ConsoleTransport<W: Write = io::Stdout> {
    sink: W,
    broker: String,
    connected: bool,
    inbound: VecDeque<InboundMessage>,
}

impl ConsoleTransport<io::Stdout> {
    pub fn stdout(broker: impl Into<String>) -> Self {
        Self::new(io::stdout(), broker)
    }
}

impl<W: Write> ConsoleTransport<W> {
    pub fn new(sink: W, broker: impl Into<String>) -> Self {
        Self {
            sink,
            broker: broker.into(),
            connected: false,
            inbound: VecDeque::new(),
        }
    }

    /// Queue a message for delivery on the next poll
    pub fn inject(&mut self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.inbound.push_back(InboundMessage::new(topic, payload));
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub fn into_sink(self) -> W {
        self.sink
    }
}

impl<W: Write> BrokerTransport for ConsoleTransport<W> {
    fn connect(&mut self, client_id: &str, credentials: Option<&Credentials>) -> TransportResult<()> {
        self.connected = true;
        let username = credentials.map(|c| c.username.as_str());
        info!(broker = %self.broker, client_id, username, "Console session opened");
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
        info!(topic, "Console subscription");
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> TransportResult<()> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        let write = |sink: &mut W| -> io::Result<()> {
            sink.write_all(topic.as_bytes())?;
            sink.write_all(b" ")?;
            sink.write_all(payload)?;
            sink.write_all(b"\n")?;
            sink.flush()
        };

        write(&mut self.sink).map_err(|e| TransportError::Io {
            details: e.to_string(),
        })
    }

    fn poll(&mut self) -> TransportResult<Vec<InboundMessage>> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        Ok(self.inbound.drain(..).collect())
    }
}
