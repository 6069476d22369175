//! Multi-client fixtures.
//!
//! A [`TestNetwork`] is one in-memory host plus one manual clock. Every
//! [`TestClient`] created from it is an independent installation with its
//! own writer id, blob and tracked-state store.

use crate::dav_host::MemoryDavHost;
use blobsync_engine::{
    FileBlob, FileStateStore, LockRecord, ManualClock, MemoryBlob, MemoryStateStore,
    RemoteLayout, StateStore, SyncConfig, SyncCoordinator, SyncOutcome, SyncState, WriterId,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Base URL of the in-memory host.
pub const TEST_BASE_URL: &str = "https://dav.test/remote.php/dav";
/// User accepted by the in-memory host.
pub const TEST_USER: &str = "sync";
/// Password accepted by the in-memory host.
pub const TEST_PASSWORD: &str = "s3cret";
/// Project used by the fixtures.
pub const TEST_PROJECT: &str = "hotel-main";
/// Wall-clock start of every test network (2023-11-14).
pub const TEST_EPOCH_MS: u64 = 1_700_000_000_000;

/// Configuration pointing at the in-memory host.
pub fn test_config() -> SyncConfig {
    SyncConfig::new(TEST_BASE_URL, TEST_USER, TEST_PASSWORD, TEST_PROJECT)
}

/// Coordinator over in-memory collaborators.
pub type MemoryCoordinator =
    SyncCoordinator<MemoryDavHost, Arc<MemoryBlob>, Arc<MemoryStateStore>>;

/// Coordinator over on-disk collaborators.
pub type FileCoordinator = SyncCoordinator<MemoryDavHost, FileBlob, FileStateStore>;

/// One installation talking to the test host.
pub struct TestClient {
    /// The coordinator under test.
    pub coordinator: MemoryCoordinator,
    /// The installation's live state.
    pub blob: Arc<MemoryBlob>,
    /// The installation's tracked states.
    pub store: Arc<MemoryStateStore>,
    /// The installation's identity.
    pub writer_id: WriterId,
}

impl TestClient {
    /// Pushes without force.
    pub fn push(&self) -> SyncOutcome {
        self.coordinator.sync_up(false)
    }

    /// Pushes, overriding conflicts.
    pub fn push_forced(&self) -> SyncOutcome {
        self.coordinator.sync_up(true)
    }

    /// Pulls without force.
    pub fn pull(&self) -> SyncOutcome {
        self.coordinator.sync_down(false)
    }

    /// Pulls, overriding divergence.
    pub fn pull_forced(&self) -> SyncOutcome {
        self.coordinator.sync_down(true)
    }

    /// Makes a local edit.
    pub fn edit(&self, bytes: impl Into<Vec<u8>>) {
        self.blob.set(bytes);
    }

    /// Returns the live state.
    pub fn contents(&self) -> Vec<u8> {
        self.blob.get()
    }

    /// Returns the tracked state for the test project.
    pub fn tracked(&self) -> Option<SyncState> {
        self.store
            .get(self.coordinator.tracked_key())
            .expect("memory store never fails")
    }
}

/// An in-memory host shared by any number of clients.
pub struct TestNetwork {
    /// The host.
    pub host: MemoryDavHost,
    /// The clock shared by every client.
    pub clock: Arc<ManualClock>,
}

impl Default for TestNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl TestNetwork {
    /// Creates an empty host requiring the test credentials.
    pub fn new() -> Self {
        Self {
            host: MemoryDavHost::new(TEST_BASE_URL).with_credentials(TEST_USER, TEST_PASSWORD),
            clock: Arc::new(ManualClock::new(TEST_EPOCH_MS)),
        }
    }

    /// Adds an installation named `name` whose live state is `initial`.
    pub fn client(&self, name: &str, initial: &[u8]) -> TestClient {
        self.client_with(name, initial, test_config())
    }

    /// Adds an installation with a custom configuration.
    pub fn client_with(&self, name: &str, initial: &[u8], config: SyncConfig) -> TestClient {
        let writer_id = WriterId::new(name).expect("valid writer id");
        let blob = Arc::new(MemoryBlob::new(initial.to_vec()));
        let store = Arc::new(MemoryStateStore::new());
        let coordinator = SyncCoordinator::new(
            config,
            writer_id.clone(),
            self.host.clone(),
            blob.clone(),
            store.clone(),
        )
        .expect("valid test config")
        .with_clock(self.clock.clone());

        TestClient {
            coordinator,
            blob,
            store,
            writer_id,
        }
    }

    /// Adds an installation whose blob and store live under `dir`.
    pub fn file_client(&self, name: &str, dir: &Path) -> FileCoordinator {
        let writer_id = WriterId::new(name).expect("valid writer id");
        let store = FileStateStore::open(dir.join("state")).expect("open state store");
        SyncCoordinator::new(
            test_config(),
            writer_id,
            self.host.clone(),
            FileBlob::new(dir.join("app.db")),
            store,
        )
        .expect("valid test config")
        .with_clock(self.clock.clone())
    }

    /// Layout of the test project.
    pub fn layout(&self) -> RemoteLayout {
        test_config().layout().expect("valid test layout")
    }

    /// Committed remote blob.
    pub fn remote_db(&self) -> Option<Vec<u8>> {
        self.host.file(&self.layout().db())
    }

    /// Published remote state.
    pub fn remote_state(&self) -> Option<SyncState> {
        self.host
            .file(&self.layout().state())
            .map(|b| SyncState::decode(&b).expect("valid remote state"))
    }

    /// Remote lock marker.
    pub fn remote_lock(&self) -> Option<LockRecord> {
        self.host
            .file(&self.layout().lock())
            .map(|b| LockRecord::decode(&b).expect("valid remote lock"))
    }

    /// Returns true if a staging file is present.
    pub fn has_staging(&self) -> bool {
        self.host.has(&self.layout().staging())
    }

    /// Moves the shared clock forward.
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }
}
