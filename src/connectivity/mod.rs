//! Broker connectivity
//!
//! The pub/sub wire protocol and socket/TLS handling live behind
//! [`BrokerTransport`]. [`ConnectivityManager`] drives it through
//! connect, subscribe, publish and bounded retry.

pub mod transport;
pub mod topic;
pub mod clock;
pub mod manager;
pub mod mock;
pub mod console;
pub mod error;

pub use transport::{BrokerTransport, Credentials, InboundMessage};
pub use topic::Topic;
pub use clock::{Clock, SystemClock, ManualClock};
pub use manager::{
    ConnectivityManager, ConnectivityConfig, ConnectionState, ConnectivityEvent,
    ConnectivityStats, MessageCallback,
};
pub use mock::MockTransport;
pub use console::ConsoleTransport;
pub use error::{TransportError, TransportResult};
