//! # blobsync Engine
//!
//! Push/pull synchronization of a single database file through a passive
//! WebDAV host.
//!
//! This crate provides:
//! - [`WebDavTransport`], a thin client for the six WebDAV verbs the engine needs
//! - [`LockManager`], a TTL-bounded lock marker per remote project
//! - [`StateStore`], the local memory of the last state each client saw
//! - [`SyncCoordinator`], which orchestrates push (`sync_up`) and pull (`sync_down`)
//!
//! ## Architecture
//!
//! The remote project holds one committed blob, one published
//! [`SyncState`] stamp and, while a push is in flight, one lock marker.
//! A push uploads to a staging path and renames it onto the final path, so no
//! reader ever sees a half-written blob. A pull verifies the downloaded bytes
//! against the published hash before handing them to the application.
//!
//! ## Key Invariants
//!
//! - The published `contentHash` always describes bytes that were committed
//! - The final blob path is only ever replaced by a single MOVE
//! - The push lock is released on every exit path except process death
//! - Conflicts are raised only when both sides moved away from the last common stamp
//! - `sync_up` and `sync_down` never return `Err`; failures are [`SyncOutcome`] values

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod blob;
mod clock;
mod config;
mod coordinator;
mod error;
mod http;
mod lock;
mod outcome;
mod tracked;
mod transport;

pub use blob::{BlobSource, FileBlob, MemoryBlob};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{SyncConfig, DEFAULT_SYNC_ROOT};
pub use coordinator::{SyncCoordinator, SyncPhase, SyncStats};
pub use error::{SyncError, SyncErrorKind, SyncResult};
pub use http::{DavMethod, DavRequest, DavResponse, HttpClient};
#[cfg(feature = "reqwest-client")]
pub use http::ReqwestClient;
pub use lock::{LockAttempt, LockManager, RemoteLock};
pub use outcome::{SyncConflict, SyncDirection, SyncOutcome, SyncStatus};
pub use tracked::{FileStateStore, MemoryStateStore, StateStore};
pub use transport::WebDavTransport;

pub use blobsync_protocol::{
    content_hash, LockRecord, RemoteLayout, SyncState, WriterId, DEFAULT_LOCK_TTL_MS,
};
