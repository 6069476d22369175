//! # blobsync Protocol
//!
//! Remote record types and codecs for blobsync.
//!
//! This crate provides:
//! - [`SyncState`], the published version stamp of a remote project
//! - [`LockRecord`], the TTL-bounded push lock marker
//! - [`WriterId`], the per-installation writer identity
//! - [`RemoteLayout`], the file layout of one project on the remote host
//! - SHA-256 content hashing of state blobs
//!
//! This is a pure data crate with no I/O operations. Records are stored on
//! the remote host as JSON with camelCase keys so every installation, in any
//! language, reads the same files.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod hash;
mod layout;
mod lock;
mod state;
mod writer;

pub use error::{ProtocolError, ProtocolResult};
pub use hash::{content_hash, is_content_hash, HASH_HEX_LEN};
pub use layout::{RemoteLayout, DEFAULT_STAGING_SUFFIX};
pub use lock::{LockRecord, DEFAULT_LOCK_TTL_MS};
pub use state::{SyncState, STATE_FORMAT_VERSION};
pub use writer::WriterId;
