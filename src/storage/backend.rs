//! Byte-addressable non-volatile storage capability

use crate::storage::{StorageError, StorageResult};

/// Byte-addressable non-volatile medium (EEPROM, flash page, image file).
///
/// Writes may be buffered until [`NvStorage::commit`]; a backend is allowed
/// to stop part-way through a write and report [`StorageError::Interrupted`],
/// leaving the leading bytes written.
pub trait NvStorage {
    /// Size of the addressable region in bytes
    fn capacity(&self) -> usize;

    /// Fill `buf` with the bytes starting at `offset`
    fn read(&self, offset: usize, buf: &mut [u8]) -> StorageResult<()>;

    /// Write `data` starting at `offset`
    fn write(&mut self, offset: usize, data: &[u8]) -> StorageResult<()>;

    /// Flush pending writes to the medium
    fn commit(&mut self) -> StorageResult<()>;
}

/// Reject accesses that do not fit inside `capacity`.
pub(crate) fn check_range(offset: usize, len: usize, capacity: usize) -> StorageResult<()> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(StorageError::OutOfRange {
            offset,
            len,
            capacity,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range() {
        assert!(check_range(0, 10, 10).is_ok());
        assert!(check_range(4, 6, 10).is_ok());
        assert!(matches!(
            check_range(5, 6, 10),
            Err(StorageError::OutOfRange { offset: 5, len: 6, capacity: 10 })
        ));
        assert!(check_range(usize::MAX, 2, 10).is_err());
    }
}
