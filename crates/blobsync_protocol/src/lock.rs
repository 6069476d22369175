//! Push lock record.

use crate::error::{ProtocolError, ProtocolResult};
use crate::writer::WriterId;
use serde::{Deserialize, Serialize};

/// Default lock time-to-live (60 seconds).
pub const DEFAULT_LOCK_TTL_MS: u64 = 60_000;

/// A TTL-bounded mutual-exclusion marker for one remote project.
///
/// Exists only while a push is in flight, or until its TTL lapses when the
/// holder crashed without releasing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRecord {
    /// Installation holding the lock.
    pub writer_id: WriterId,
    /// Acquisition time in milliseconds since the Unix epoch.
    pub acquired_at: u64,
    /// Time-to-live in milliseconds.
    pub ttl: u64,
}

impl LockRecord {
    /// Creates a lock record acquired by `writer_id` at `now_ms`.
    pub fn new(writer_id: WriterId, now_ms: u64, ttl_ms: u64) -> Self {
        Self {
            writer_id,
            acquired_at: now_ms,
            ttl: ttl_ms,
        }
    }

    /// Returns the instant (epoch ms) at which the lock lapses.
    pub fn expires_at(&self) -> u64 {
        self.acquired_at.saturating_add(self.ttl)
    }

    /// Returns true if the lock has lapsed at `now_ms`.
    ///
    /// A lock is expired from `acquired_at + ttl` onwards, inclusive.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at()
    }

    /// Returns true if the lock is held by `writer_id`.
    pub fn is_held_by(&self, writer_id: &WriterId) -> bool {
        &self.writer_id == writer_id
    }

    /// Encodes to JSON.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|source| ProtocolError::Encode {
            record: "lock",
            source,
        })
    }

    /// Decodes from JSON.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        serde_json::from_slice(bytes).map_err(|source| ProtocolError::Malformed {
            record: "lock",
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_boundary_is_inclusive() {
        let lock = LockRecord::new(WriterId::new("a").unwrap(), 1_000, DEFAULT_LOCK_TTL_MS);
        assert_eq!(lock.expires_at(), 61_000);
        assert!(!lock.is_expired(1_000));
        assert!(!lock.is_expired(60_999));
        assert!(lock.is_expired(61_000));
        assert!(lock.is_expired(u64::MAX));
    }

    #[test]
    fn huge_ttl_does_not_overflow() {
        let lock = LockRecord::new(WriterId::new("a").unwrap(), u64::MAX - 1, u64::MAX);
        assert_eq!(lock.expires_at(), u64::MAX);
    }

    #[test]
    fn wire_format() {
        let body = br#"{"writerId":"tablet","acquiredAt":10,"ttl":60000}"#;
        let lock = LockRecord::decode(body).unwrap();
        assert!(lock.is_held_by(&WriterId::new("tablet").unwrap()));
        assert_eq!(lock.expires_at(), 60_010);

        let json: serde_json::Value = serde_json::from_slice(&lock.encode().unwrap()).unwrap();
        assert_eq!(json["acquiredAt"], 10);
        assert_eq!(json["ttl"], 60_000);
    }

    #[test]
    fn blank_holder_is_malformed() {
        let body = br#"{"writerId":"","acquiredAt":10,"ttl":60000}"#;
        assert!(matches!(
            LockRecord::decode(body),
            Err(ProtocolError::Malformed { record: "lock", .. })
        ));
    }
}
