//! On-disk blob and tracked-state store driven through the coordinator.

use blobsync_engine::{FileStateStore, StateStore, SyncDirection, SyncError, SyncErrorKind};
use blobsync_testkit::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn file_clients_round_trip_and_remember_state() {
    let net = TestNetwork::new();
    let desk_dir = tempdir().unwrap();
    let laptop_dir = tempdir().unwrap();
    fs::write(desk_dir.path().join("app.db"), b"sqlite bytes").unwrap();

    let tracked_key;
    {
        let desk = net.file_client("desk", desk_dir.path());
        let laptop = net.file_client("laptop", laptop_dir.path());
        assert!(desk.sync_up(false).success);

        let outcome = laptop.sync_down(false);
        assert!(outcome.applied, "{:?}", outcome.error_message());
        tracked_key = laptop.tracked_key().to_string();
    }

    assert_eq!(
        fs::read(laptop_dir.path().join("app.db")).unwrap(),
        b"sqlite bytes"
    );

    // The tracked state survived the coordinator.
    let store = FileStateStore::open(laptop_dir.path().join("state")).unwrap();
    assert_eq!(store.get(&tracked_key).unwrap(), net.remote_state());
    assert_eq!(store.paths(), vec![tracked_key]);
}

#[test]
fn reopened_client_continues_without_conflict() {
    let net = TestNetwork::new();
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("app.db"), b"v1").unwrap();

    {
        let desk = net.file_client("desk", dir.path());
        assert!(desk.sync_up(false).success);
    }

    // Another installation publishes v2.
    let tablet = net.client("tablet", b"");
    assert!(tablet.pull().applied);
    tablet.edit(b"v2".to_vec());
    assert!(tablet.push().success);

    let desk = net.file_client("desk", dir.path());
    let outcome = desk.sync_down(false);
    assert!(outcome.applied, "{:?}", outcome.error_message());
    assert_eq!(fs::read(dir.path().join("app.db")).unwrap(), b"v2");
}

#[test]
fn second_opener_is_refused() {
    let net = TestNetwork::new();
    let dir = tempdir().unwrap();
    let _desk = net.file_client("desk", dir.path());

    assert!(matches!(
        FileStateStore::open(dir.path().join("state")),
        Err(SyncError::StoreLocked)
    ));
}

#[test]
fn missing_database_file_fails_before_any_request() {
    let net = TestNetwork::new();
    let dir = tempdir().unwrap();
    let desk = net.file_client("desk", dir.path());

    let outcome = desk.sync_up(false);
    assert_eq!(outcome.error.unwrap().kind(), SyncErrorKind::Local);
    assert!(net.host.requests().is_empty());
}

#[test]
fn status_without_database_file_reports_remote() {
    let net = TestNetwork::new();
    let desk = net.client("desk", b"v1");
    assert!(desk.push().success);

    let dir = tempdir().unwrap();
    let laptop = net.file_client("laptop", dir.path());
    let status = laptop.status().unwrap();
    assert_eq!(status.live_hash, None);
    assert_eq!(status.direction, SyncDirection::NeverSynced);
    assert_eq!(status.remote_state, net.remote_state());

    assert!(laptop.sync_down(false).applied);
    let status = laptop.status().unwrap();
    assert_eq!(status.direction, SyncDirection::UpToDate);
}
