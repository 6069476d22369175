//! Published sync state.

use crate::error::{ProtocolError, ProtocolResult};
use crate::hash::content_hash;
use crate::writer::WriterId;
use serde::{Deserialize, Serialize};

/// Format version written into every published state.
pub const STATE_FORMAT_VERSION: u32 = 1;

/// The last known-good version of a remote project.
///
/// One `SyncState` exists per remote project path, stored next to the
/// committed blob. It is replaced wholesale on every successful push and is
/// also what each client remembers locally as its tracked state.
///
/// # Invariants
///
/// - `content_hash` equals [`content_hash`] of the blob committed at the
///   project's `db` path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// Record format version.
    pub version: u32,
    /// Commit time in milliseconds since the Unix epoch.
    pub last_modified: u64,
    /// Lowercase hex SHA-256 of the committed blob.
    pub content_hash: String,
    /// Installation that published this state.
    pub writer_id: WriterId,
}

impl SyncState {
    /// Creates a state describing `blob` as published by `writer_id` at `now_ms`.
    pub fn for_blob(blob: &[u8], writer_id: WriterId, now_ms: u64) -> Self {
        Self::new(content_hash(blob), writer_id, now_ms)
    }

    /// Creates a state from an already computed content hash.
    pub fn new(content_hash: impl Into<String>, writer_id: WriterId, now_ms: u64) -> Self {
        Self {
            version: STATE_FORMAT_VERSION,
            last_modified: now_ms,
            content_hash: content_hash.into(),
            writer_id,
        }
    }

    /// Returns true if this state was published by `writer_id`.
    pub fn is_authored_by(&self, writer_id: &WriterId) -> bool {
        &self.writer_id == writer_id
    }

    /// Returns true if `blob` is the content this state describes.
    pub fn matches(&self, blob: &[u8]) -> bool {
        self.content_hash == content_hash(blob)
    }

    /// Encodes to JSON.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|source| ProtocolError::Encode {
            record: "state",
            source,
        })
    }

    /// Decodes from JSON.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        serde_json::from_slice(bytes).map_err(|source| ProtocolError::Malformed {
            record: "state",
            source,
        })
    }
}
