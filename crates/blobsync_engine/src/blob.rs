//! The application's state blob.
//!
//! The engine never looks inside the blob. It only needs to export the
//! current state as bytes and to replace the current state from bytes.

use crate::error::{SyncError, SyncResult};
use crate::tracked::sync_directory;
use parking_lot::RwLock;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source and sink of the application's serialized state.
pub trait BlobSource: Send + Sync {
    /// Serializes the entire current state.
    fn export_blob(&self) -> SyncResult<Vec<u8>>;

    /// Replaces the entire current state.
    fn load_blob(&self, bytes: &[u8]) -> SyncResult<()>;

    /// Returns false when there is no local state to export yet.
    fn blob_exists(&self) -> bool {
        true
    }
}

impl<B: BlobSource + ?Sized> BlobSource for Arc<B> {
    fn export_blob(&self) -> SyncResult<Vec<u8>> {
        (**self).export_blob()
    }

    fn load_blob(&self, bytes: &[u8]) -> SyncResult<()> {
        (**self).load_blob(bytes)
    }

    fn blob_exists(&self) -> bool {
        (**self).blob_exists()
    }
}

/// An in-memory blob.
#[derive(Debug, Default)]
pub struct MemoryBlob {
    bytes: RwLock<Vec<u8>>,
    loads: AtomicU64,
}

impl MemoryBlob {
    /// Creates a blob holding `bytes`.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: RwLock::new(bytes.into()),
            loads: AtomicU64::new(0),
        }
    }

    /// Replaces the contents, as a local edit would.
    pub fn set(&self, bytes: impl Into<Vec<u8>>) {
        *self.bytes.write() = bytes.into();
    }

    /// Returns a copy of the contents.
    pub fn get(&self) -> Vec<u8> {
        self.bytes.read().clone()
    }

    /// Number of times the engine loaded bytes into this blob.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }
}

impl BlobSource for MemoryBlob {
    fn export_blob(&self) -> SyncResult<Vec<u8>> {
        Ok(self.get())
    }

    fn load_blob(&self, bytes: &[u8]) -> SyncResult<()> {
        *self.bytes.write() = bytes.to_vec();
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A database file on disk.
///
/// Loading writes a sibling temp file, fsyncs it, and renames it over the
/// database file.
#[derive(Debug, Clone)]
pub struct FileBlob {
    path: PathBuf,
}

impl FileBlob {
    /// Creates a blob backed by `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".incoming");
        self.path.with_file_name(name)
    }
}

impl BlobSource for FileBlob {
    fn export_blob(&self) -> SyncResult<Vec<u8>> {
        fs::read(&self.path)
            .map_err(|e| SyncError::Blob(format!("cannot read {}: {e}", self.path.display())))
    }

    fn load_blob(&self, bytes: &[u8]) -> SyncResult<()> {
        let temp_path = self.temp_path();
        let write = || -> std::io::Result<()> {
            let mut file = File::create(&temp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            drop(file);
            fs::rename(&temp_path, &self.path)
        };
        write().map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            SyncError::Blob(format!("cannot write {}: {e}", self.path.display()))
        })?;

        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => sync_directory(parent),
            _ => Ok(()),
        }
    }

    fn blob_exists(&self) -> bool {
        self.path.is_file()
    }
}
