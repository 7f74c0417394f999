//! In-memory EEPROM image for tests and host runs

use crate::storage::backend::check_range;
use crate::storage::{NvStorage, StorageError, StorageResult};

/// Value of a never-programmed EEPROM/flash cell
pub const ERASED_BYTE: u8 = 0xFF;

/// RAM-backed storage that can simulate power loss mid-write
pub struct MemoryStorage {
    data: Vec<u8>,
    /// Bytes that may still be written before the simulated power loss
    write_budget: Option<usize>,
    fail_reads: bool,
    bytes_written: usize,
    commit_count: u32,
}

impl MemoryStorage {
    /// Create a zero-filled image
    pub fn new(capacity: usize) -> Self {
        Self::filled(capacity, 0x00)
    }

    /// Create an image in factory (erased) state
    pub fn erased(capacity: usize) -> Self {
        Self::filled(capacity, ERASED_BYTE)
    }

    /// Wrap an existing image
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            write_budget: None,
            fail_reads: false,
            bytes_written: 0,
            commit_count: 0,
        }
    }

    fn filled(capacity: usize, value: u8) -> Self {
        Self::from_bytes(vec![value; capacity])
    }

    /// Lose power after `bytes` more bytes have been written.
    ///
    /// The write that crosses the limit stores its leading bytes and fails
    /// with [`StorageError::Interrupted`]; every later write fails without
    /// storing anything until [`MemoryStorage::restore_power`].
    pub fn interrupt_after(&mut self, bytes: usize) {
        self.write_budget = Some(bytes);
    }

    /// Clear a pending or triggered power-loss simulation
    pub fn restore_power(&mut self) {
        self.write_budget = None;
    }

    /// Make every read fail with an I/O error
    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    /// Flip every bit of the byte at `offset`
    pub fn corrupt_byte(&mut self, offset: usize) {
        if let Some(byte) = self.data.get_mut(offset) {
            *byte ^= 0xFF;
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    pub fn commit_count(&self) -> u32 {
        self.commit_count
    }
}

impl NvStorage for MemoryStorage {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> StorageResult<()> {
        if self.fail_reads {
            return Err(StorageError::Io {
                details: "simulated read failure".to_string(),
            });
        }

        check_range(offset, buf.len(), self.data.len())?;
        buf.copy_from_slice(&self.data[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> StorageResult<()> {
        check_range(offset, data.len(), self.data.len())?;

        let allowed = match self.write_budget {
            Some(budget) => budget.min(data.len()),
            None => data.len(),
        };

        self.data[offset..offset + allowed].copy_from_slice(&data[..allowed]);
        self.bytes_written += allowed;

        if let Some(budget) = self.write_budget.as_mut() {
            *budget -= allowed;
        }

        if allowed < data.len() {
            return Err(StorageError::Interrupted {
                written: allowed,
                requested: data.len(),
            });
        }

        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        if self.write_budget == Some(0) {
            return Err(StorageError::Interrupted {
                written: 0,
                requested: 0,
            });
        }

        self.commit_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write() {
        let mut storage = MemoryStorage::new(16);
        storage.write(4, &[1, 2, 3]).unwrap();

        let mut buf = [0u8; 5];
        storage.read(3, &mut buf).unwrap();
        assert_eq!(buf, [0, 1, 2, 3, 0]);
        assert_eq!(storage.bytes_written(), 3);
    }

    #[test]
    fn test_erased_state() {
        let storage = MemoryStorage::erased(4);
        assert_eq!(storage.as_bytes(), &[ERASED_BYTE; 4]);
    }

    #[test]
    fn test_out_of_range() {
        let mut storage = MemoryStorage::new(8);
        assert!(matches!(
            storage.write(6, &[0; 4]),
            Err(StorageError::OutOfRange { .. })
        ));
        let mut buf = [0u8; 9];
        assert!(storage.read(0, &mut buf).is_err());
    }

    #[test]
    fn test_power_loss_mid_write() {
        let mut storage = MemoryStorage::new(8);
        storage.interrupt_after(2);

        let result = storage.write(0, &[9, 9, 9, 9]);
        assert_eq!(
            result,
            Err(StorageError::Interrupted { written: 2, requested: 4 })
        );
        assert_eq!(&storage.as_bytes()[..4], &[9, 9, 0, 0]);

        // Nothing lands after the cut
        assert!(storage.write(4, &[7]).is_err());
        assert!(storage.commit().is_err());
        assert_eq!(storage.as_bytes()[4], 0);

        storage.restore_power();
        storage.write(4, &[7]).unwrap();
        storage.commit().unwrap();
        assert_eq!(storage.as_bytes()[4], 7);
        assert_eq!(storage.commit_count(), 1);
    }

    #[test]
    fn test_read_failure_simulation() {
        let mut storage = MemoryStorage::new(4);
        storage.set_fail_reads(true);
        let mut buf = [0u8; 1];
        assert!(matches!(storage.read(0, &mut buf), Err(StorageError::Io { .. })));
    }

    #[test]
    fn test_corrupt_byte() {
        let mut storage = MemoryStorage::new(2);
        storage.corrupt_byte(1);
        assert_eq!(storage.as_bytes(), &[0x00, 0xFF]);
        // Ignored when out of range
        storage.corrupt_byte(10);
    }
}
