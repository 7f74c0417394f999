//! Position acquisition
//!
//! Sentence decoding is left to a [`GpsReceiver`] implementation; this module
//! only decides whether a usable fix exists and exposes its fields.

pub mod receiver;
pub mod source;
pub mod mock;
pub mod replay;
pub mod error;

pub use receiver::{GpsReceiver, ReceiverState};
pub use source::PositionSource;
pub use mock::MockGpsReceiver;
pub use replay::ReplayGpsReceiver;
pub use error::{GpsError, GpsResult};
