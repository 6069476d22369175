//! Remote lock behavior and failure paths of a push.

use blobsync_engine::{
    content_hash, DavMethod, LockManager, LockRecord, MemoryBlob, RemoteLock, StateStore,
    SyncCoordinator, SyncError, SyncErrorKind, SyncResult, SyncState, WebDavTransport, WriterId,
};
use blobsync_testkit::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn writer(id: &str) -> WriterId {
    WriterId::new(id).unwrap()
}

fn lock_manager(net: &TestNetwork) -> LockManager<MemoryDavHost> {
    let transport = Arc::new(WebDavTransport::new(
        TEST_BASE_URL,
        TEST_USER,
        TEST_PASSWORD,
        net.host.clone(),
    ));
    transport.make_dir_all(&net.layout().dir_chain()).unwrap();
    LockManager::new(transport, net.clock.clone())
}

fn plant_foreign_lock(net: &TestNetwork, holder: &str) -> LockRecord {
    let record = LockRecord::new(writer(holder), TEST_EPOCH_MS, 60_000);
    net.host.put_raw(&net.layout().lock(), record.encode().unwrap());
    record
}

#[test]
fn lock_excludes_until_ttl_lapses() {
    let net = TestNetwork::new();
    let locks = lock_manager(&net);
    let layout = net.layout();

    assert!(locks.acquire_lock(&layout, &writer("a"), 60_000).unwrap());
    net.advance(Duration::from_millis(59_999));
    assert!(!locks.acquire_lock(&layout, &writer("b"), 60_000).unwrap());
    assert_eq!(net.remote_lock().unwrap().writer_id, writer("a"));

    net.advance(Duration::from_millis(1));
    assert!(locks.acquire_lock(&layout, &writer("b"), 60_000).unwrap());
    let record = net.remote_lock().unwrap();
    assert_eq!(record.writer_id, writer("b"));
    assert_eq!(record.acquired_at, TEST_EPOCH_MS + 60_000);
}

#[test]
fn release_swallows_missing_lock() {
    let net = TestNetwork::new();
    let locks = lock_manager(&net);
    locks.release_lock(&net.layout());
    net.host.fail(DavMethod::Delete, "/lock", FaultAction::Network);
    locks.release_lock(&net.layout());
}

#[test]
fn foreign_lock_blocks_push_without_uploading() {
    let net = TestNetwork::new();
    let record = plant_foreign_lock(&net, "tablet");
    let desk = net.client("desk", b"v1");

    let outcome = desk.push();
    assert!(!outcome.success);
    match outcome.error.unwrap() {
        SyncError::LockContention {
            holder,
            expires_at_ms,
        } => {
            assert_eq!(holder, writer("tablet"));
            assert_eq!(expires_at_ms, TEST_EPOCH_MS + 60_000);
        }
        other => panic!("expected lock contention, got {other}"),
    }
    assert_eq!(net.host.count(DavMethod::Put, "db.uploading"), 0);
    assert!(net.remote_db().is_none());
    // The holder's lock is left alone.
    assert_eq!(net.remote_lock(), Some(record));
}

#[test]
fn forced_push_still_respects_lock() {
    let net = TestNetwork::new();
    plant_foreign_lock(&net, "tablet");
    let desk = net.client("desk", b"v1");
    let outcome = desk.push_forced();
    assert_eq!(outcome.error.unwrap().kind(), SyncErrorKind::LockContention);
}

#[test]
fn expired_lock_is_taken_over() {
    let net = TestNetwork::new();
    plant_foreign_lock(&net, "crashed-tablet");
    let desk = net.client("desk", b"v1");

    net.advance(Duration::from_secs(60));
    let outcome = desk.push();
    assert!(outcome.success, "{:?}", outcome.error_message());
    assert!(net.remote_lock().is_none());
}

#[test]
fn own_stale_lock_does_not_block() {
    let net = TestNetwork::new();
    plant_foreign_lock(&net, "desk");
    let desk = net.client("desk", b"v1");
    assert!(desk.push().success);
}

#[test]
fn break_lock_clears_foreign_lock() {
    let net = TestNetwork::new();
    plant_foreign_lock(&net, "tablet");
    let desk = net.client("desk", b"v1");

    let status = desk.coordinator.status().unwrap();
    assert_eq!(status.lock.unwrap().writer_id, writer("tablet"));

    desk.coordinator.break_lock().unwrap();
    assert!(net.remote_lock().is_none());
    assert!(desk.push().success);
}

#[test]
fn malformed_lock_fails_push_until_broken() {
    let net = TestNetwork::new();
    net.host.put_raw(&net.layout().lock(), b"{\"writer".to_vec());
    let desk = net.client("desk", b"v1");

    let outcome = desk.push();
    assert!(matches!(outcome.error, Some(SyncError::Codec(_))));
    assert!(net.remote_db().is_none());

    desk.coordinator.break_lock().unwrap();
    assert!(desk.push().success);
}

#[test]
fn every_failure_point_releases_the_lock_and_keeps_db_whole() {
    for point in CrashPoint::ALL {
        let net = TestNetwork::new();
        let desk = net.client("desk", b"v1");
        assert!(desk.push().success);

        desk.edit(b"v2".to_vec());
        point.arm(&net.host, &net.layout());
        let outcome = desk.push();
        assert!(!outcome.success, "{point:?} should fail");
        assert_eq!(
            outcome.error.unwrap().kind(),
            SyncErrorKind::Transport,
            "{point:?}"
        );

        assert!(net.remote_lock().is_none(), "{point:?} left the lock behind");
        assert!(!net.has_staging(), "{point:?} left the staging file behind");
        let expected: &[u8] = if point.commits() { b"v2" } else { b"v1" };
        assert_eq!(net.remote_db().unwrap(), expected, "{point:?}");
        if point.holds_lock() {
            assert_eq!(net.host.count(DavMethod::Delete, "/lock"), 2, "{point:?}");
        }

        // The next attempt goes through and leaves a consistent pair.
        let retry = desk.push();
        assert!(retry.success, "{point:?}: {:?}", retry.error_message());
        let state = net.remote_state().unwrap();
        assert_eq!(state.content_hash, blobsync_engine::content_hash(b"v2"));
        assert_eq!(net.remote_db().unwrap(), b"v2");
    }
}

#[test]
fn move_failure_keeps_previous_commit_for_readers() {
    let net = TestNetwork::new();
    let desk = net.client("desk", b"v1");
    let laptop = net.client("laptop", b"");
    assert!(desk.push().success);

    desk.edit(b"v2".to_vec());
    CrashPoint::BeforeCommit.arm(&net.host, &net.layout());
    assert!(!desk.push().success);

    assert!(laptop.pull().applied);
    assert_eq!(laptop.contents(), b"v1");
}

#[test]
fn unpublished_commit_is_refused_by_readers_until_next_push() {
    let net = TestNetwork::new();
    let desk = net.client("desk", b"v1");
    let laptop = net.client("laptop", b"");
    assert!(desk.push().success);

    desk.edit(b"v2".to_vec());
    CrashPoint::BeforePublish.arm(&net.host, &net.layout());
    assert!(!desk.push().success);

    let outcome = laptop.pull();
    assert_eq!(outcome.error.unwrap().kind(), SyncErrorKind::Integrity);
    assert_eq!(laptop.contents(), b"");

    assert!(desk.push().success);
    assert!(laptop.pull().applied);
    assert_eq!(laptop.contents(), b"v2");
}

#[test]
fn wrong_credentials_fail_without_retry_hint() {
    let net = TestNetwork::new();
    let config = test_config();
    let config = blobsync_engine::SyncConfig {
        password: "wrong".into(),
        ..config
    };
    let desk = net.client_with("desk", b"v1", config);

    let outcome = desk.push();
    let error = outcome.error.unwrap();
    assert!(matches!(error, SyncError::Transport { status: Some(401), .. }));
    assert!(!error.is_retryable());
}

#[test]
fn wrong_credentials_are_not_an_empty_remote() {
    let net = TestNetwork::new();
    let desk = net.client("desk", b"v1");
    assert!(desk.push().success);

    let config = blobsync_engine::SyncConfig {
        password: "wrong".into(),
        ..test_config()
    };
    let laptop = net.client_with("laptop", b"", config);

    let outcome = laptop.pull();
    assert!(!outcome.success);
    assert!(outcome.state.is_none());
    assert!(matches!(
        outcome.error,
        Some(SyncError::Transport { status: Some(401), .. })
    ));
    assert_eq!(laptop.blob.load_count(), 0);

    assert!(matches!(
        laptop.coordinator.status(),
        Err(SyncError::Transport { status: Some(401), .. })
    ));
}

#[test]
fn network_outage_is_retryable() {
    let net = TestNetwork::new();
    let desk = net.client("desk", b"v1");
    net.host.fail(DavMethod::Get, "/state", FaultAction::Network);

    let outcome = desk.push();
    assert!(outcome.error.unwrap().is_retryable());
    assert_eq!(desk.coordinator.stats().failures, 1);
}

/// Tracked-state store whose writes always fail.
struct ReadOnlyStore;

impl StateStore for ReadOnlyStore {
    fn get(&self, _path: &str) -> SyncResult<Option<SyncState>> {
        Ok(None)
    }

    fn put(&self, _path: &str, _state: &SyncState) -> SyncResult<()> {
        Err(SyncError::LocalState("disk full".into()))
    }
}

#[test]
fn tracking_failure_after_publish_says_remote_moved() {
    let net = TestNetwork::new();
    let desk = SyncCoordinator::new(
        test_config(),
        writer("desk"),
        net.host.clone(),
        MemoryBlob::new(b"v1".to_vec()),
        ReadOnlyStore,
    )
    .unwrap()
    .with_clock(net.clock.clone());

    let outcome = desk.sync_up(false);
    assert!(!outcome.success);
    let error = outcome.error.unwrap();
    assert_eq!(error.kind(), SyncErrorKind::Local);
    let message = error.to_string();
    assert!(message.contains("remote now holds"), "{message}");
    assert!(message.contains(&content_hash(b"v1")), "{message}");

    // The commit landed and the lock was still released.
    assert_eq!(net.remote_db().unwrap(), b"v1");
    assert_eq!(net.remote_state().unwrap().content_hash, content_hash(b"v1"));
    assert!(net.remote_lock().is_none());
}
