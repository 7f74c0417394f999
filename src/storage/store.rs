//! Persistent geofence configuration store

use crate::core::GeofenceConfig;
use crate::storage::record::{ConfigRecord, SLOT_COUNT, SLOT_SIZE, STORE_SIZE};
use crate::storage::{NvStorage, StorageError, StorageResult};
use tracing::{debug, info, warn};

/// Durable geofence configuration with a cached in-memory copy.
///
/// Saves alternate between two checksummed slots. A save only ever overwrites
/// the slot that does not hold the current record, so an interrupted save
/// leaves the previous record intact and [`PersistentConfigStore::load`]
/// returns either the old or the new configuration in full.
pub struct PersistentConfigStore<S: NvStorage> {
    storage: S,
    base_offset: usize,
    cached: GeofenceConfig,
    /// Sequence of the newest valid record (0 before the first save)
    sequence: u32,
    /// Slot holding the newest valid record
    active_slot: Option<usize>,
}

impl<S: NvStorage> PersistentConfigStore<S> {
    /// Create a store over `storage` without reading it yet
    pub fn new(storage: S, base_offset: usize) -> StorageResult<Self> {
        let capacity = storage.capacity();
        if base_offset
            .checked_add(STORE_SIZE)
            .map_or(true, |end| end > capacity)
        {
            return Err(StorageError::OutOfRange {
                offset: base_offset,
                len: STORE_SIZE,
                capacity,
            });
        }

        Ok(Self {
            storage,
            base_offset,
            cached: GeofenceConfig::unset(),
            sequence: 0,
            active_slot: None,
        })
    }

    /// Create a store and load the persisted configuration
    pub fn open(storage: S, base_offset: usize) -> StorageResult<Self> {
        let mut store = Self::new(storage, base_offset)?;
        store.load();
        Ok(store)
    }

    /// Read the newest valid record from the medium into the cache.
    ///
    /// Factory state, corrupted slots and read failures all fall back to the
    /// unset configuration; this never fails.
    pub fn load(&mut self) -> GeofenceConfig {
        match self.scan() {
            Ok(Some((slot, record))) => {
                self.cached = record.config;
                self.sequence = record.sequence;
                self.active_slot = Some(slot);
                info!(
                    slot,
                    sequence = record.sequence,
                    latitude = record.config.center_latitude,
                    longitude = record.config.center_longitude,
                    radius_m = record.config.radius_m,
                    "Loaded geofence configuration"
                );
            }
            Ok(None) => {
                self.cached = GeofenceConfig::unset();
                self.sequence = 0;
                self.active_slot = None;
                warn!("No valid geofence record found, geofencing disabled");
            }
            Err(e) => {
                // Slot placement is recomputed from the medium on the next save
                self.cached = GeofenceConfig::unset();
                warn!(error = %e, "Geofence storage unreadable, geofencing disabled");
            }
        }

        self.cached
    }

    /// Persist `config` as one logical commit and update the cache.
    ///
    /// On failure the cached configuration is left unchanged.
    pub fn save(&mut self, config: GeofenceConfig) -> StorageResult<()> {
        if !config.has_valid_center() {
            return Err(StorageError::InvalidConfig {
                reason: format!(
                    "center ({}, {}) outside WGS-84 range",
                    config.center_latitude, config.center_longitude
                ),
            });
        }

        // Place the record relative to what is on the medium now, not what
        // the last load saw; an unreadable medium refuses the save.
        let (target, sequence) = match self.scan()? {
            Some((slot, newest)) => ((slot + 1) % SLOT_COUNT, newest.sequence.wrapping_add(1)),
            None => (0, self.sequence.wrapping_add(1)),
        };
        let record = ConfigRecord::new(sequence, config);

        let offset = self.slot_offset(target);
        self.storage.write(offset, &record.encode())?;
        self.storage.commit()?;

        self.cached = config;
        self.sequence = sequence;
        self.active_slot = Some(target);

        info!(
            slot = target,
            sequence,
            latitude = config.center_latitude,
            longitude = config.center_longitude,
            radius_m = config.radius_m,
            "Saved geofence configuration"
        );
        Ok(())
    }

    /// Replace the geofence and persist it
    pub fn set_geofence(&mut self, latitude: f64, longitude: f64, radius_m: u16) -> StorageResult<()> {
        self.save(GeofenceConfig::new(latitude, longitude, radius_m))
    }

    pub fn config(&self) -> GeofenceConfig {
        self.cached
    }

    pub fn center(&self) -> (f64, f64) {
        (self.cached.center_latitude, self.cached.center_longitude)
    }

    pub fn radius(&self) -> u16 {
        self.cached.radius_m
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Slot holding the newest record, as of the last load or save
    pub fn active_slot(&self) -> Option<usize> {
        self.active_slot
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    fn slot_offset(&self, slot: usize) -> usize {
        self.base_offset + slot * SLOT_SIZE
    }

    /// Newest valid record on the medium.
    ///
    /// Slots that fail to decode are skipped; a failed read is an error.
    fn scan(&self) -> StorageResult<Option<(usize, ConfigRecord)>> {
        let mut newest: Option<(usize, ConfigRecord)> = None;

        for slot in 0..SLOT_COUNT {
            let mut bytes = [0u8; SLOT_SIZE];
            self.storage.read(self.slot_offset(slot), &mut bytes)?;

            match ConfigRecord::decode(&bytes) {
                Ok(record) => {
                    let is_newer = newest
                        .as_ref()
                        .map_or(true, |(_, current)| record.is_newer_than(current));
                    if is_newer {
                        newest = Some((slot, record));
                    }
                }
                Err(reason) => {
                    debug!(slot, %reason, "Geofence slot holds no valid record");
                }
            }
        }

        Ok(newest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn fresh_store() -> PersistentConfigStore<MemoryStorage> {
        PersistentConfigStore::open(MemoryStorage::erased(64), 0).unwrap()
    }

    #[test]
    fn test_factory_state_loads_sentinel() {
        let store = fresh_store();
        assert_eq!(store.config(), GeofenceConfig::unset());
        assert_eq!(store.radius(), 0);
        assert_eq!(store.center(), (0.0, 0.0));
    }

    #[test]
    fn test_zeroed_medium_loads_sentinel() {
        let store = PersistentConfigStore::open(MemoryStorage::new(64), 0).unwrap();
        assert_eq!(store.config(), GeofenceConfig::unset());
    }

    #[test]
    fn test_store_must_fit() {
        let result = PersistentConfigStore::new(MemoryStorage::new(STORE_SIZE), 1);
        assert!(matches!(result, Err(StorageError::OutOfRange { .. })));
        assert!(PersistentConfigStore::new(MemoryStorage::new(STORE_SIZE), 0).is_ok());
    }

    #[test]
    fn test_save_then_reload() {
        let mut store = fresh_store();
        store.set_geofence(40.0, -3.0, 100).unwrap();
        assert_eq!(store.center(), (40.0, -3.0));
        assert_eq!(store.radius(), 100);

        let reopened = PersistentConfigStore::open(store.into_storage(), 0).unwrap();
        assert_eq!(reopened.config(), GeofenceConfig::new(40.0, -3.0, 100));
    }

    #[test]
    fn test_saves_alternate_slots() {
        let mut store = fresh_store();
        store.set_geofence(1.0, 1.0, 10).unwrap();
        store.set_geofence(2.0, 2.0, 20).unwrap();
        store.set_geofence(3.0, 3.0, 30).unwrap();
        assert_eq!(store.sequence(), 3);
        assert_eq!(store.active_slot(), Some(0));

        let bytes = store.storage().as_bytes();
        let slot0 = ConfigRecord::decode(&bytes[..SLOT_SIZE]).unwrap();
        let slot1 = ConfigRecord::decode(&bytes[SLOT_SIZE..STORE_SIZE]).unwrap();
        assert_eq!(slot0.sequence, 3);
        assert_eq!(slot1.sequence, 2);

        let mut reopened = PersistentConfigStore::open(store.into_storage(), 0).unwrap();
        assert_eq!(reopened.radius(), 30);

        // Continues the sequence after reload
        reopened.set_geofence(4.0, 4.0, 40).unwrap();
        assert_eq!(reopened.sequence(), 4);
    }

    #[test]
    fn test_base_offset_respected() {
        let mut store = PersistentConfigStore::open(MemoryStorage::new(100), 30).unwrap();
        store.set_geofence(10.0, 20.0, 5).unwrap();

        let bytes = store.storage().as_bytes();
        assert!(bytes[..30].iter().all(|&b| b == 0));
        assert!(ConfigRecord::decode(&bytes[30..30 + SLOT_SIZE]).is_ok());
    }

    #[test]
    fn test_invalid_config_rejected_without_write() {
        let mut store = fresh_store();
        store.set_geofence(40.0, -3.0, 100).unwrap();
        let written = store.storage().bytes_written();

        let result = store.set_geofence(95.0, 0.0, 100);
        assert!(matches!(result, Err(StorageError::InvalidConfig { .. })));
        assert_eq!(store.config(), GeofenceConfig::new(40.0, -3.0, 100));
        assert_eq!(store.storage().bytes_written(), written);
    }

    #[test]
    fn test_failed_save_keeps_cached_config() {
        let mut store = fresh_store();
        store.set_geofence(40.0, -3.0, 100).unwrap();

        store.storage_mut().interrupt_after(5);
        assert!(store.set_geofence(41.0, -4.0, 200).is_err());
        assert_eq!(store.config(), GeofenceConfig::new(40.0, -3.0, 100));
    }

    #[test]
    fn test_interrupted_save_never_mixes_fields() {
        let old = GeofenceConfig::new(40.0, -3.0, 100);
        let new = GeofenceConfig::new(-33.9, 151.2, 2500);

        for cut in 0..=SLOT_SIZE {
            let mut store = fresh_store();
            store.save(old).unwrap();

            store.storage_mut().interrupt_after(cut);
            let _ = store.save(new);

            let mut storage = store.into_storage();
            storage.restore_power();
            let reloaded = PersistentConfigStore::open(storage, 0).unwrap().config();

            assert!(
                reloaded == old || reloaded == new,
                "cut after {} bytes produced {:?}",
                cut,
                reloaded
            );
            if cut < SLOT_SIZE {
                assert_eq!(reloaded, old, "cut after {} bytes", cut);
            }
        }
    }

    #[test]
    fn test_interrupted_first_save_falls_back_to_sentinel() {
        let mut storage = MemoryStorage::erased(64);
        storage.interrupt_after(12);
        let mut store = PersistentConfigStore::open(storage, 0).unwrap();
        assert!(store.set_geofence(40.0, -3.0, 100).is_err());

        let mut storage = store.into_storage();
        storage.restore_power();
        let reloaded = PersistentConfigStore::open(storage, 0).unwrap();
        assert_eq!(reloaded.config(), GeofenceConfig::unset());
    }

    #[test]
    fn test_corrupted_newest_slot_falls_back_to_previous() {
        let mut store = fresh_store();
        store.set_geofence(1.0, 1.0, 10).unwrap();
        store.set_geofence(2.0, 2.0, 20).unwrap();

        // Newest record lives in slot 1
        let mut storage = store.into_storage();
        storage.corrupt_byte(SLOT_SIZE + 10);

        let reloaded = PersistentConfigStore::open(storage, 0).unwrap();
        assert_eq!(reloaded.config(), GeofenceConfig::new(1.0, 1.0, 10));
    }

    #[test]
    fn test_save_after_unreadable_load_lands_newest() {
        let mut store = fresh_store();
        store.set_geofence(1.0, 1.0, 10).unwrap();
        store.set_geofence(2.0, 2.0, 20).unwrap();

        store.storage_mut().set_fail_reads(true);
        assert_eq!(store.load(), GeofenceConfig::unset());
        store.storage_mut().set_fail_reads(false);

        store.set_geofence(3.0, 3.0, 30).unwrap();
        assert_eq!(store.sequence(), 3);

        let reopened = PersistentConfigStore::open(store.into_storage(), 0).unwrap();
        assert_eq!(reopened.config(), GeofenceConfig::new(3.0, 3.0, 30));
    }

    #[test]
    fn test_save_refused_while_unreadable() {
        let mut store = fresh_store();
        store.set_geofence(1.0, 1.0, 10).unwrap();
        let written = store.storage().bytes_written();

        store.storage_mut().set_fail_reads(true);
        let result = store.set_geofence(2.0, 2.0, 20);
        assert!(matches!(result, Err(StorageError::Io { .. })));
        assert_eq!(store.config(), GeofenceConfig::new(1.0, 1.0, 10));
        assert_eq!(store.storage().bytes_written(), written);
    }

    #[test]
    fn test_read_failure_falls_back_to_sentinel() {
        let mut store = fresh_store();
        store.set_geofence(1.0, 1.0, 10).unwrap();

        store.storage_mut().set_fail_reads(true);
        assert_eq!(store.load(), GeofenceConfig::unset());
    }
}
