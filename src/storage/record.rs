//! On-medium layout of the geofence record
//!
//! Each slot holds one complete configuration:
//!
//! ```text
//! offset  size  field
//!      0     1  magic (0x47)
//!      1     1  layout version
//!      2     4  sequence number, big-endian
//!      6     8  center latitude, f64 little-endian
//!     14     8  center longitude, f64 little-endian
//!     22     2  radius in meters, big-endian
//!     24     4  CRC-32 (IEEE) of bytes 0..24, big-endian
//! ```
//!
//! Two slots sit back to back at the store's base offset.

use crate::core::GeofenceConfig;
use thiserror::Error;

pub const RECORD_MAGIC: u8 = 0x47;
pub const RECORD_VERSION: u8 = 1;
pub const SLOT_SIZE: usize = 28;
pub const SLOT_COUNT: usize = 2;
pub const STORE_SIZE: usize = SLOT_SIZE * SLOT_COUNT;

const CRC_OFFSET: usize = 24;

/// Reasons a slot does not hold a usable record
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("Slot too short: need {required} bytes, got {available}")]
    Truncated { required: usize, available: usize },
    #[error("Bad magic byte 0x{found:02X}")]
    BadMagic { found: u8 },
    #[error("Unsupported record version {version}")]
    UnsupportedVersion { version: u8 },
    #[error("Checksum mismatch: stored 0x{stored:08X}, computed 0x{computed:08X}")]
    ChecksumMismatch { stored: u32, computed: u32 },
    #[error("Stored center ({latitude}, {longitude}) is not a WGS-84 coordinate")]
    InvalidCenter { latitude: f64, longitude: f64 },
}

/// A geofence configuration tagged with its write sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfigRecord {
    pub sequence: u32,
    pub config: GeofenceConfig,
}

impl ConfigRecord {
    pub fn new(sequence: u32, config: GeofenceConfig) -> Self {
        Self { sequence, config }
    }

    pub fn encode(&self) -> [u8; SLOT_SIZE] {
        let mut bytes = [0u8; SLOT_SIZE];
        bytes[0] = RECORD_MAGIC;
        bytes[1] = RECORD_VERSION;
        bytes[2..6].copy_from_slice(&self.sequence.to_be_bytes());
        bytes[6..14].copy_from_slice(&self.config.center_latitude.to_le_bytes());
        bytes[14..22].copy_from_slice(&self.config.center_longitude.to_le_bytes());
        bytes[22..24].copy_from_slice(&self.config.radius_m.to_be_bytes());

        let crc = crc32(&bytes[..CRC_OFFSET]);
        bytes[CRC_OFFSET..].copy_from_slice(&crc.to_be_bytes());
        bytes
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, RecordError> {
        if bytes.len() < SLOT_SIZE {
            return Err(RecordError::Truncated {
                required: SLOT_SIZE,
                available: bytes.len(),
            });
        }

        if bytes[0] != RECORD_MAGIC {
            return Err(RecordError::BadMagic { found: bytes[0] });
        }

        if bytes[1] != RECORD_VERSION {
            return Err(RecordError::UnsupportedVersion { version: bytes[1] });
        }

        let stored = u32::from_be_bytes(read_array(&bytes[CRC_OFFSET..SLOT_SIZE]));
        let computed = crc32(&bytes[..CRC_OFFSET]);
        if stored != computed {
            return Err(RecordError::ChecksumMismatch { stored, computed });
        }

        let sequence = u32::from_be_bytes(read_array(&bytes[2..6]));
        let latitude = f64::from_le_bytes(read_array(&bytes[6..14]));
        let longitude = f64::from_le_bytes(read_array(&bytes[14..22]));
        let radius_m = u16::from_be_bytes(read_array(&bytes[22..24]));

        let config = GeofenceConfig::new(latitude, longitude, radius_m);
        if !config.has_valid_center() {
            return Err(RecordError::InvalidCenter { latitude, longitude });
        }

        Ok(Self { sequence, config })
    }

    /// Whether this record was written after `other`, tolerating sequence wrap
    pub fn is_newer_than(&self, other: &ConfigRecord) -> bool {
        (self.sequence.wrapping_sub(other.sequence) as i32) > 0
    }
}

fn read_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

/// CRC-32 (IEEE 802.3, reflected, polynomial 0xEDB88320)
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}
