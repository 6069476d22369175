//! Push/pull orchestration.
//!
//! A push exports the blob, checks the remote for divergence, takes the lock,
//! uploads to the staging path and renames it onto the final path, then
//! publishes the new state. A pull fetches the published state, checks for
//! divergence, downloads, verifies the hash and hands the bytes to the
//! application.

use crate::blob::BlobSource;
use crate::clock::{Clock, SystemClock};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::http::HttpClient;
use crate::lock::{LockAttempt, LockManager, RemoteLock};
use crate::outcome::{SyncConflict, SyncDirection, SyncOutcome, SyncStatus};
use crate::tracked::StateStore;
use crate::transport::WebDavTransport;
use blobsync_protocol::{content_hash, RemoteLayout, SyncState, WriterId};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

const BLOB_CONTENT_TYPE: &str = "application/octet-stream";
const STATE_CONTENT_TYPE: &str = "application/json";

/// Where a push or pull currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No operation has run yet.
    Idle,
    /// Push: comparing the published state against the tracked one.
    CheckRemote,
    /// Push: taking the remote lock.
    AcquireLock,
    /// Push: uploading the blob to the staging path.
    UploadStaging,
    /// Push: renaming the staging file onto the final path.
    Commit,
    /// Push: writing the new state record.
    PublishState,
    /// Push: removing the lock marker.
    ReleaseLock,
    /// Pull: reading the published state.
    FetchRemote,
    /// Pull: downloading the committed blob.
    Download,
    /// Pull: checking the downloaded bytes against the published hash.
    Verify,
    /// Pull: handing the bytes to the application.
    Apply,
    /// The last operation completed.
    Done,
    /// The last operation stopped on a conflict.
    Conflict,
    /// The last operation failed.
    Error,
}

impl SyncPhase {
    /// Returns true while an operation is in flight.
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            SyncPhase::Idle | SyncPhase::Done | SyncPhase::Conflict | SyncPhase::Error
        )
    }
}

/// Counters over the lifetime of a coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Completed pushes.
    pub pushes: u64,
    /// Completed pulls, including "up to date" and "remote empty".
    pub pulls: u64,
    /// Pulls that replaced the local blob.
    pub blobs_applied: u64,
    /// Operations stopped by a conflict.
    pub conflicts: u64,
    /// Operations that failed for any other reason.
    pub failures: u64,
    /// Epoch milliseconds of the last completed operation.
    pub last_sync_ms: Option<u64>,
    /// Message of the last failure.
    pub last_error: Option<String>,
}

/// Releases the push lock when dropped.
struct LockGuard<'a> {
    lock: &'a dyn RemoteLock,
    layout: &'a RemoteLayout,
    released: bool,
}

impl<'a> LockGuard<'a> {
    fn new(lock: &'a dyn RemoteLock, layout: &'a RemoteLayout) -> Self {
        Self {
            lock,
            layout,
            released: false,
        }
    }

    fn release(mut self) {
        self.released = true;
        self.lock.release_lock(self.layout);
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.lock.release_lock(self.layout);
        }
    }
}

/// Synchronizes one application blob with one remote project.
pub struct SyncCoordinator<C: HttpClient + 'static, B: BlobSource, S: StateStore> {
    config: SyncConfig,
    layout: RemoteLayout,
    tracked_key: String,
    writer_id: WriterId,
    transport: Arc<WebDavTransport<C>>,
    lock: Box<dyn RemoteLock>,
    blob: B,
    store: S,
    clock: Arc<dyn Clock>,
    phase: RwLock<SyncPhase>,
    stats: RwLock<SyncStats>,
}

impl<C: HttpClient + 'static, B: BlobSource, S: StateStore> SyncCoordinator<C, B, S> {
    /// Creates a coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotConfigured`] if the configuration is
    /// incomplete or names an invalid remote path.
    pub fn new(
        config: SyncConfig,
        writer_id: WriterId,
        client: C,
        blob: B,
        store: S,
    ) -> SyncResult<Self> {
        config.validate()?;
        let layout = config.layout()?;
        let transport = Arc::new(WebDavTransport::from_config(&config, client));
        let tracked_key = transport.url(&layout.dir());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let lock = Box::new(LockManager::new(transport.clone(), clock.clone()));

        Ok(Self {
            config,
            layout,
            tracked_key,
            writer_id,
            transport,
            lock,
            blob,
            store,
            clock,
            phase: RwLock::new(SyncPhase::Idle),
            stats: RwLock::new(SyncStats::default()),
        })
    }

    /// Uses `clock` for state timestamps and lock expiry.
    ///
    /// Replaces the lock manager with one reading the same clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.lock = Box::new(LockManager::new(self.transport.clone(), clock.clone()));
        self.clock = clock;
        self
    }

    /// Uses a custom lock implementation.
    #[must_use]
    pub fn with_lock(mut self, lock: impl RemoteLock + 'static) -> Self {
        self.lock = Box::new(lock);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the remote layout.
    pub fn layout(&self) -> &RemoteLayout {
        &self.layout
    }

    /// Returns this installation's writer id.
    pub fn writer_id(&self) -> &WriterId {
        &self.writer_id
    }

    /// Returns the key under which the tracked state is stored.
    pub fn tracked_key(&self) -> &str {
        &self.tracked_key
    }

    /// Returns the application blob.
    pub fn blob(&self) -> &B {
        &self.blob
    }

    /// Returns the tracked-state store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the current phase.
    pub fn phase(&self) -> SyncPhase {
        *self.phase.read()
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Publishes the local blob.
    ///
    /// With `force`, the divergence check is skipped and the local blob
    /// replaces whatever the remote holds.
    pub fn sync_up(&self, force: bool) -> SyncOutcome {
        match self.push(force) {
            Ok(state) => {
                self.set_phase(SyncPhase::Done);
                let mut stats = self.stats.write();
                stats.pushes += 1;
                stats.last_sync_ms = Some(state.last_modified);
                info!(hash = %state.content_hash, "push complete");
                SyncOutcome::succeeded(Some(state), false)
            }
            Err(e) => SyncOutcome::failed(self.record_failure("push", e)),
        }
    }

    /// Fetches the remote blob.
    ///
    /// With `force`, the divergence check is skipped and the remote blob is
    /// downloaded and applied even if the tracked state says it is current.
    pub fn sync_down(&self, force: bool) -> SyncOutcome {
        match self.pull(force) {
            Ok((state, applied)) => {
                self.set_phase(SyncPhase::Done);
                let mut stats = self.stats.write();
                stats.pulls += 1;
                if applied {
                    stats.blobs_applied += 1;
                }
                stats.last_sync_ms = Some(self.clock.now_ms());
                match &state {
                    Some(s) if applied => info!(hash = %s.content_hash, "pull applied"),
                    Some(_) => info!("pull: already up to date"),
                    None => info!("pull: remote is empty"),
                }
                SyncOutcome::succeeded(state, applied)
            }
            Err(e) => SyncOutcome::failed(self.record_failure("pull", e)),
        }
    }

    /// Reports where local and remote stand without changing either.
    pub fn status(&self) -> SyncResult<SyncStatus> {
        let remote_state = self.fetch_remote_state()?;
        let local_state = self.store.get(&self.tracked_key)?;
        let live_hash = if self.blob.blob_exists() {
            Some(content_hash(&self.blob.export_blob()?))
        } else {
            None
        };
        let lock = self.lock.inspect_lock(&self.layout)?;
        let direction = SyncDirection::derive(
            remote_state.as_ref(),
            local_state.as_ref(),
            live_hash.as_deref(),
        );

        Ok(SyncStatus {
            remote_state,
            local_state,
            live_hash,
            lock,
            direction,
        })
    }

    /// Deletes the remote lock marker regardless of its holder.
    pub fn break_lock(&self) -> SyncResult<()> {
        self.lock.break_lock(&self.layout)
    }

    fn push(&self, force: bool) -> SyncResult<SyncState> {
        let blob = self.blob.export_blob()?;
        let tracked = self.store.get(&self.tracked_key)?;

        if !force {
            self.set_phase(SyncPhase::CheckRemote);
            if let Some(remote) = self.fetch_remote_state()? {
                let same_hash = tracked
                    .as_ref()
                    .is_some_and(|t| t.content_hash == remote.content_hash);
                if !same_hash && !remote.is_authored_by(&self.writer_id) {
                    return Err(SyncError::Conflict(Box::new(SyncConflict {
                        remote_state: remote,
                        local_state: tracked,
                    })));
                }
            }
        }

        // The lock marker lives inside the project directory.
        self.transport.make_dir_all(&self.layout.dir_chain())?;

        self.set_phase(SyncPhase::AcquireLock);
        let ttl = self.config.lock_ttl_ms();
        if let LockAttempt::Held(current) =
            self.lock.try_acquire(&self.layout, &self.writer_id, ttl)?
        {
            return Err(SyncError::LockContention {
                expires_at_ms: current.expires_at(),
                holder: current.writer_id,
            });
        }
        let guard = LockGuard::new(self.lock.as_ref(), &self.layout);

        let state = self.commit(&blob)?;

        self.set_phase(SyncPhase::ReleaseLock);
        guard.release();
        Ok(state)
    }

    fn commit(&self, blob: &[u8]) -> SyncResult<SyncState> {
        let staging = self.layout.staging();

        self.set_phase(SyncPhase::UploadStaging);
        if let Err(e) = self.transport.put_file(&staging, blob, BLOB_CONTENT_TYPE) {
            self.discard_staging(&staging);
            return Err(e);
        }

        self.set_phase(SyncPhase::Commit);
        if let Err(e) = self.transport.move_file(&staging, &self.layout.db(), true) {
            self.discard_staging(&staging);
            return Err(e);
        }

        self.set_phase(SyncPhase::PublishState);
        let state = SyncState::for_blob(blob, self.writer_id.clone(), self.clock.now_ms());
        self.transport
            .put_file(&self.layout.state(), &state.encode()?, STATE_CONTENT_TYPE)?;
        if let Err(e) = self.store.put(&self.tracked_key, &state) {
            warn!(hash = %state.content_hash, error = %e, "published but not tracked");
            return Err(SyncError::LocalState(format!(
                "remote now holds {} but the tracked state was not saved: {e}",
                state.content_hash
            )));
        }
        Ok(state)
    }

    fn pull(&self, force: bool) -> SyncResult<(Option<SyncState>, bool)> {
        self.set_phase(SyncPhase::FetchRemote);
        let Some(remote) = self.fetch_remote_state()? else {
            return Ok((None, false));
        };
        let tracked = self.store.get(&self.tracked_key)?;

        if !force {
            if let Some(tracked) = &tracked {
                if !remote.is_authored_by(&self.writer_id)
                    && remote.content_hash != tracked.content_hash
                {
                    let live_hash = content_hash(&self.blob.export_blob()?);
                    if live_hash != tracked.content_hash {
                        return Err(SyncError::Conflict(Box::new(SyncConflict {
                            remote_state: remote,
                            local_state: Some(tracked.clone()),
                        })));
                    }
                }
            }
        }

        let stale = tracked
            .as_ref()
            .map_or(true, |t| t.content_hash != remote.content_hash);
        if !force && !stale {
            return Ok((Some(remote), false));
        }

        self.set_phase(SyncPhase::Download);
        let bytes = self.transport.get_file(&self.layout.db())?;

        self.set_phase(SyncPhase::Verify);
        let actual = content_hash(&bytes);
        if actual != remote.content_hash {
            return Err(SyncError::Integrity {
                expected: remote.content_hash,
                actual,
            });
        }

        self.set_phase(SyncPhase::Apply);
        self.blob.load_blob(&bytes)?;
        self.store.put(&self.tracked_key, &remote)?;
        Ok((Some(remote), true))
    }

    fn fetch_remote_state(&self) -> SyncResult<Option<SyncState>> {
        match self.transport.get_file_if_exists(&self.layout.state())? {
            Some(bytes) => Ok(Some(SyncState::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn discard_staging(&self, staging: &str) {
        if let Err(e) = self.transport.delete_file(staging) {
            warn!(error = %e, "failed to remove staging file");
        }
    }

    fn set_phase(&self, phase: SyncPhase) {
        debug!(?phase, "sync phase");
        *self.phase.write() = phase;
    }

    fn record_failure(&self, operation: &str, error: SyncError) -> SyncError {
        let mut stats = self.stats.write();
        if let Some(conflict) = error.conflict() {
            self.set_phase(SyncPhase::Conflict);
            stats.conflicts += 1;
            warn!(operation, %conflict, "sync conflict");
        } else {
            self.set_phase(SyncPhase::Error);
            stats.failures += 1;
            warn!(operation, error = %error, "sync failed");
        }
        stats.last_error = Some(error.to_string());
        error
    }
}
