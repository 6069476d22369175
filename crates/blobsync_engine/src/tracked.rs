//! Local memory of the last sync state each remote project was seen in.
//!
//! The tracked state is what lets the coordinator tell "the remote moved on"
//! apart from "I edited locally". It is per installation and never shared.

use crate::error::{SyncError, SyncResult};
use blobsync_protocol::SyncState;
use fs2::FileExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const TRACKED_FILE: &str = "tracked.cbor";
const TRACKED_TEMP: &str = "tracked.cbor.tmp";
const LOCK_FILE: &str = "LOCK";
const TRACKED_FORMAT_VERSION: u32 = 1;

/// Storage for tracked states, keyed by remote project path.
pub trait StateStore: Send + Sync {
    /// Returns the tracked state for `path`, if any.
    fn get(&self, path: &str) -> SyncResult<Option<SyncState>>;

    /// Replaces the tracked state for `path`.
    fn put(&self, path: &str, state: &SyncState) -> SyncResult<()>;
}

impl<S: StateStore + ?Sized> StateStore for Arc<S> {
    fn get(&self, path: &str) -> SyncResult<Option<SyncState>> {
        (**self).get(path)
    }

    fn put(&self, path: &str, state: &SyncState) -> SyncResult<()> {
        (**self).put(path, state)
    }
}

/// A non-persistent store.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: RwLock<HashMap<String, SyncState>>,
}

impl MemoryStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked paths.
    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    /// Returns true if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, path: &str) -> SyncResult<Option<SyncState>> {
        Ok(self.states.read().get(path).cloned())
    }

    fn put(&self, path: &str, state: &SyncState) -> SyncResult<()> {
        self.states.write().insert(path.to_string(), state.clone());
        Ok(())
    }
}

/// On-disk envelope of the tracked-state file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct TrackedFile {
    version: u32,
    states: BTreeMap<String, SyncState>,
}

/// A store persisted in a local directory.
///
/// # Layout
///
/// ```text
/// <dir>/
/// ├─ tracked.cbor   # CBOR map of remote path -> SyncState
/// └─ LOCK           # held exclusively while the store is open
/// ```
///
/// Writes go to a temporary file which is fsynced and renamed over
/// `tracked.cbor`, so a crash leaves either the old or the new map.
#[derive(Debug)]
pub struct FileStateStore {
    dir: PathBuf,
    states: RwLock<BTreeMap<String, SyncState>>,
    _lock_file: File,
}

impl FileStateStore {
    /// Opens (creating if needed) the store in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreLocked`] if another process has the store
    /// open, or [`SyncError::LocalState`] if the tracked file is corrupt.
    pub fn open(dir: impl AsRef<Path>) -> SyncResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(SyncError::StoreLocked);
        }

        let states = Self::load(&dir.join(TRACKED_FILE))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            states: RwLock::new(states),
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Forgets the tracked state for `path`. Returns true if one existed.
    pub fn remove(&self, path: &str) -> SyncResult<bool> {
        let mut states = self.states.write();
        if !states.contains_key(path) {
            return Ok(false);
        }
        let mut next = states.clone();
        next.remove(path);
        self.persist(&next)?;
        *states = next;
        Ok(true)
    }

    /// Lists every tracked remote path.
    pub fn paths(&self) -> Vec<String> {
        self.states.read().keys().cloned().collect()
    }

    fn load(path: &Path) -> SyncResult<BTreeMap<String, SyncState>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let bytes = fs::read(path)?;
        let file: TrackedFile = ciborium::de::from_reader(bytes.as_slice())
            .map_err(|e| SyncError::LocalState(format!("corrupt {}: {e}", path.display())))?;
        if file.version != TRACKED_FORMAT_VERSION {
            return Err(SyncError::LocalState(format!(
                "unsupported tracked-state version {}",
                file.version
            )));
        }
        Ok(file.states)
    }

    fn persist(&self, states: &BTreeMap<String, SyncState>) -> SyncResult<()> {
        let envelope = TrackedFile {
            version: TRACKED_FORMAT_VERSION,
            states: states.clone(),
        };
        let mut data = Vec::new();
        ciborium::ser::into_writer(&envelope, &mut data)
            .map_err(|e| SyncError::LocalState(e.to_string()))?;

        let temp_path = self.dir.join(TRACKED_TEMP);
        let mut file = File::create(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, self.dir.join(TRACKED_FILE))?;
        sync_directory(&self.dir)
    }
}

impl StateStore for FileStateStore {
    fn get(&self, path: &str) -> SyncResult<Option<SyncState>> {
        Ok(self.states.read().get(path).cloned())
    }

    fn put(&self, path: &str, state: &SyncState) -> SyncResult<()> {
        let mut states = self.states.write();
        let mut next = states.clone();
        next.insert(path.to_string(), state.clone());
        // Disk first: memory never runs ahead of what survives a restart.
        self.persist(&next)?;
        *states = next;
        Ok(())
    }
}

#[cfg(unix)]
pub(crate) fn sync_directory(dir: &Path) -> SyncResult<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn sync_directory(_dir: &Path) -> SyncResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobsync_protocol::WriterId;
    use tempfile::tempdir;

    fn state(hash: &str) -> SyncState {
        SyncState::new(hash, WriterId::new("desk").unwrap(), 42)
    }

    #[test]
    fn memory_store_put_get() {
        let store = MemoryStateStore::new();
        assert!(store.is_empty());
        assert!(store.get("https://h/p").unwrap().is_none());

        store.put("https://h/p", &state("aa")).unwrap();
        store.put("https://h/p", &state("bb")).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("https://h/p").unwrap().unwrap().content_hash, "bb");
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = FileStateStore::open(dir.path()).unwrap();
            store.put("https://h/a", &state("aa")).unwrap();
            store.put("https://h/b", &state("bb")).unwrap();
        }
        let store = FileStateStore::open(dir.path()).unwrap();
        assert_eq!(store.get("https://h/a").unwrap(), Some(state("aa")));
        assert_eq!(store.paths(), vec!["https://h/a", "https://h/b"]);
        assert!(!dir.path().join(TRACKED_TEMP).exists());
    }

    #[test]
    fn file_store_refuses_second_opener() {
        let dir = tempdir().unwrap();
        let _first = FileStateStore::open(dir.path()).unwrap();
        assert!(matches!(
            FileStateStore::open(dir.path()),
            Err(SyncError::StoreLocked)
        ));
    }

    #[test]
    fn file_store_remove() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::open(dir.path()).unwrap();
        store.put("https://h/a", &state("aa")).unwrap();
        assert!(store.remove("https://h/a").unwrap());
        assert!(!store.remove("https://h/a").unwrap());
        drop(store);

        let store = FileStateStore::open(dir.path()).unwrap();
        assert!(store.get("https://h/a").unwrap().is_none());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(TRACKED_FILE), b"\xff\x00garbage").unwrap();
        assert!(matches!(
            FileStateStore::open(dir.path()),
            Err(SyncError::LocalState(_))
        ));
    }
}
