//! File-backed storage image for host deployments

use crate::storage::backend::check_range;
use crate::storage::memory::ERASED_BYTE;
use crate::storage::{NvStorage, StorageError, StorageResult};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Storage image kept in RAM and flushed to a file on commit.
///
/// Commit writes and syncs a sibling temporary file, then renames it over
/// the image, so the file on disk is always a complete image.
pub struct FileStorage {
    path: PathBuf,
    image: Vec<u8>,
    dirty: bool,
}

impl FileStorage {
    /// Open (or create in erased state) an image of at least `capacity` bytes.
    ///
    /// A shorter image is padded with erased bytes; a longer one is kept whole.
    pub fn open<P: AsRef<Path>>(path: P, capacity: usize) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();

        let mut image = if path.exists() {
            fs::read(&path).map_err(|e| StorageError::io("reading storage image", e))?
        } else {
            debug!(path = %path.display(), "Storage image missing, starting erased");
            Vec::new()
        };
        if image.len() < capacity {
            image.resize(capacity, ERASED_BYTE);
        }

        Ok(Self {
            path,
            image,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether there are writes not yet committed
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl NvStorage for FileStorage {
    fn capacity(&self) -> usize {
        self.image.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> StorageResult<()> {
        check_range(offset, buf.len(), self.image.len())?;
        buf.copy_from_slice(&self.image[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> StorageResult<()> {
        check_range(offset, data.len(), self.image.len())?;
        self.image[offset..offset + data.len()].copy_from_slice(data);
        self.dirty = true;
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        if !self.dirty {
            return Ok(());
        }

        let temp = self.temp_path();
        {
            let mut file =
                File::create(&temp).map_err(|e| StorageError::io("creating temp image", e))?;
            file.write_all(&self.image)
                .map_err(|e| StorageError::io("writing temp image", e))?;
            file.sync_all()
                .map_err(|e| StorageError::io("syncing temp image", e))?;
        }

        fs::rename(&temp, &self.path)
            .map_err(|e| StorageError::io("replacing storage image", e))?;
        sync_parent_dir(&self.path)?;

        self.dirty = false;
        debug!(path = %self.path.display(), bytes = self.image.len(), "Storage image committed");
        Ok(())
    }
}

/// Make the rename itself durable
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> StorageResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(parent)
        .and_then(|dir| dir.sync_all())
        .map_err(|e| StorageError::io("syncing storage directory", e))
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> StorageResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_image_is_erased() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path().join("eeprom.bin"), 8).unwrap();

        let mut buf = [0u8; 8];
        storage.read(0, &mut buf).unwrap();
        assert_eq!(buf, [ERASED_BYTE; 8]);
        assert!(!storage.is_dirty());
    }

    #[test]
    fn test_commit_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eeprom.bin");

        let mut storage = FileStorage::open(&path, 8).unwrap();
        storage.write(2, &[1, 2, 3]).unwrap();
        assert!(storage.is_dirty());
        storage.commit().unwrap();
        assert!(!storage.is_dirty());

        let reopened = FileStorage::open(&path, 8).unwrap();
        let mut buf = [0u8; 3];
        reopened.read(2, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn test_uncommitted_writes_are_lost() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eeprom.bin");

        let mut storage = FileStorage::open(&path, 4).unwrap();
        storage.write(0, &[5]).unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path, 4).unwrap();
        let mut buf = [0u8; 1];
        reopened.read(0, &mut buf).unwrap();
        assert_eq!(buf, [ERASED_BYTE]);
    }

    #[test]
    fn test_commit_leaves_only_complete_image() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eeprom.bin");

        let mut storage = FileStorage::open(&path, 6).unwrap();
        storage.write(0, &[1, 2, 3, 4, 5, 6]).unwrap();
        storage.commit().unwrap();

        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3, 4, 5, 6]);
        assert!(!dir.path().join("eeprom.bin.tmp").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_longer_image_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eeprom.bin");
        fs::write(&path, [9u8; 8]).unwrap();

        let mut storage = FileStorage::open(&path, 4).unwrap();
        assert_eq!(storage.capacity(), 8);
        storage.write(0, &[1]).unwrap();
        storage.commit().unwrap();

        assert_eq!(fs::read(&path).unwrap(), vec![1, 9, 9, 9, 9, 9, 9, 9]);
    }

    #[test]
    fn test_short_image_is_padded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eeprom.bin");
        fs::write(&path, [1u8, 2]).unwrap();

        let storage = FileStorage::open(&path, 4).unwrap();
        assert_eq!(storage.capacity(), 4);
        let mut buf = [0u8; 4];
        storage.read(0, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, ERASED_BYTE, ERASED_BYTE]);
    }
}
