//! TTL-bounded push lock.
//!
//! The remote host offers no locking primitive, so mutual exclusion is a
//! marker file at `<project>/lock`. A marker whose TTL has lapsed is treated
//! as absent, which bounds how long a crashed writer can block the others.
//!
//! Reading the marker and writing it are two separate requests; two clients
//! racing through the handshake can both believe they won. [`RemoteLock`] is
//! the seam for a stronger implementation.

use crate::clock::Clock;
use crate::error::SyncResult;
use crate::http::HttpClient;
use crate::transport::WebDavTransport;
use blobsync_protocol::{LockRecord, RemoteLayout, WriterId};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a lock attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockAttempt {
    /// The caller now holds this lock.
    Acquired(LockRecord),
    /// A valid lock belonging to someone else is in place.
    Held(LockRecord),
}

impl LockAttempt {
    /// Returns true if the lock was acquired.
    pub fn is_acquired(&self) -> bool {
        matches!(self, LockAttempt::Acquired(_))
    }
}

/// Mutual exclusion for pushes to one remote project.
pub trait RemoteLock: Send + Sync {
    /// Tries to take the lock for `writer_id`.
    ///
    /// Never waits: a foreign valid lock is reported as [`LockAttempt::Held`].
    fn try_acquire(
        &self,
        layout: &RemoteLayout,
        writer_id: &WriterId,
        ttl_ms: u64,
    ) -> SyncResult<LockAttempt>;

    /// Tries to take the lock, returning whether it succeeded.
    fn acquire_lock(
        &self,
        layout: &RemoteLayout,
        writer_id: &WriterId,
        ttl_ms: u64,
    ) -> SyncResult<bool> {
        Ok(self.try_acquire(layout, writer_id, ttl_ms)?.is_acquired())
    }

    /// Releases the lock. Never fails; problems are logged.
    fn release_lock(&self, layout: &RemoteLayout);

    /// Returns the lock currently in place, expired or not.
    fn inspect_lock(&self, layout: &RemoteLayout) -> SyncResult<Option<LockRecord>>;

    /// Removes the lock regardless of who holds it.
    fn break_lock(&self, layout: &RemoteLayout) -> SyncResult<()>;
}

impl<T: RemoteLock + ?Sized> RemoteLock for Arc<T> {
    fn try_acquire(
        &self,
        layout: &RemoteLayout,
        writer_id: &WriterId,
        ttl_ms: u64,
    ) -> SyncResult<LockAttempt> {
        (**self).try_acquire(layout, writer_id, ttl_ms)
    }

    fn release_lock(&self, layout: &RemoteLayout) {
        (**self).release_lock(layout);
    }

    fn inspect_lock(&self, layout: &RemoteLayout) -> SyncResult<Option<LockRecord>> {
        (**self).inspect_lock(layout)
    }

    fn break_lock(&self, layout: &RemoteLayout) -> SyncResult<()> {
        (**self).break_lock(layout)
    }
}

/// Lock marker file on the WebDAV host.
pub struct LockManager<C: HttpClient> {
    transport: Arc<WebDavTransport<C>>,
    clock: Arc<dyn Clock>,
}

impl<C: HttpClient> LockManager<C> {
    /// Creates a lock manager using `transport` and `clock`.
    pub fn new(transport: Arc<WebDavTransport<C>>, clock: Arc<dyn Clock>) -> Self {
        Self { transport, clock }
    }
}

impl<C: HttpClient> RemoteLock for LockManager<C> {
    fn try_acquire(
        &self,
        layout: &RemoteLayout,
        writer_id: &WriterId,
        ttl_ms: u64,
    ) -> SyncResult<LockAttempt> {
        let now = self.clock.now_ms();
        if let Some(current) = self.inspect_lock(layout)? {
            if !current.is_held_by(writer_id) && !current.is_expired(now) {
                debug!(holder = %current.writer_id, expires_at = current.expires_at(), "lock held");
                return Ok(LockAttempt::Held(current));
            }
            if !current.is_held_by(writer_id) {
                debug!(holder = %current.writer_id, "taking over expired lock");
            }
        }

        let record = LockRecord::new(writer_id.clone(), now, ttl_ms);
        self.transport
            .put_file(&layout.lock(), &record.encode()?, "application/json")?;
        debug!(writer = %writer_id, ttl_ms, "lock acquired");
        Ok(LockAttempt::Acquired(record))
    }

    fn release_lock(&self, layout: &RemoteLayout) {
        match self.transport.delete_file(&layout.lock()) {
            Ok(()) => debug!("lock released"),
            Err(e) => warn!(error = %e, "failed to release lock"),
        }
    }

    fn inspect_lock(&self, layout: &RemoteLayout) -> SyncResult<Option<LockRecord>> {
        match self.transport.get_file_if_exists(&layout.lock())? {
            Some(bytes) => Ok(Some(LockRecord::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn break_lock(&self, layout: &RemoteLayout) -> SyncResult<()> {
        warn!(path = %layout.lock(), "breaking remote lock");
        self.transport.delete_file(&layout.lock())
    }
}
