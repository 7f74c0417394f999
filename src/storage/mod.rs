//! Non-volatile geofence configuration storage
//!
//! The physical medium is abstracted behind [`NvStorage`], a byte-addressable
//! read/write/commit capability. [`PersistentConfigStore`] keeps the geofence
//! record on top of it in two checksummed slots so that an interrupted save
//! never leaves a mixed configuration behind.

pub mod backend;
pub mod memory;
pub mod file;
pub mod record;
pub mod store;
pub mod error;

pub use backend::NvStorage;
pub use memory::MemoryStorage;
pub use file::FileStorage;
pub use record::{ConfigRecord, RecordError, SLOT_SIZE, SLOT_COUNT, STORE_SIZE};
pub use store::PersistentConfigStore;
pub use error::{StorageError, StorageResult};
