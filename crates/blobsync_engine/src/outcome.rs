//! Results returned to the embedding application.

use crate::error::SyncError;
use blobsync_protocol::{LockRecord, SyncState};
use serde::Serialize;
use std::fmt;

/// Both sides of a divergence.
///
/// The engine never picks a winner. Callers resolve by forcing a push
/// (keep local), forcing a pull (keep remote), or merging by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConflict {
    /// State currently published on the remote.
    pub remote_state: SyncState,
    /// Tracked state of this installation, if it ever synced.
    pub local_state: Option<SyncState>,
}

impl fmt::Display for SyncConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "remote {} by {}, local ",
            self.remote_state.content_hash, self.remote_state.writer_id
        )?;
        match &self.local_state {
            Some(local) => f.write_str(&local.content_hash),
            None => f.write_str("<never synced>"),
        }
    }
}

/// Result of `sync_up` or `sync_down`.
#[derive(Debug)]
pub struct SyncOutcome {
    /// True if the operation completed.
    pub success: bool,
    /// The failure, if any.
    pub error: Option<SyncError>,
    /// Divergence details when the failure is a conflict.
    pub conflict: Option<SyncConflict>,
    /// The state now shared by this installation and the remote.
    pub state: Option<SyncState>,
    /// True if a pull replaced the local blob.
    pub applied: bool,
}

impl SyncOutcome {
    pub(crate) fn succeeded(state: Option<SyncState>, applied: bool) -> Self {
        Self {
            success: true,
            error: None,
            conflict: None,
            state,
            applied,
        }
    }

    pub(crate) fn failed(error: SyncError) -> Self {
        Self {
            success: false,
            conflict: error.conflict().cloned(),
            error: Some(error),
            state: None,
            applied: false,
        }
    }

    /// Human-readable failure description.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    /// Returns true if the operation stopped on a conflict.
    pub fn is_conflict(&self) -> bool {
        self.conflict.is_some()
    }
}

/// Relationship between the local blob and the remote, relative to the
/// last tracked state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncDirection {
    /// Nothing to push or pull.
    UpToDate,
    /// Local edits not yet pushed.
    LocalAhead,
    /// Remote changes not yet pulled.
    RemoteAhead,
    /// Both sides changed; a plain push or pull would conflict.
    Diverged,
    /// The remote has a state but this installation never synced.
    NeverSynced,
    /// Nothing was ever pushed to the remote.
    RemoteEmpty,
}

impl SyncDirection {
    /// Derives the direction from the three hashes involved.
    ///
    /// A missing local blob (`live_hash` of `None`) never matches a state.
    pub fn derive(
        remote: Option<&SyncState>,
        tracked: Option<&SyncState>,
        live_hash: Option<&str>,
    ) -> Self {
        let Some(remote) = remote else {
            return SyncDirection::RemoteEmpty;
        };
        let Some(tracked) = tracked else {
            return if live_hash == Some(remote.content_hash.as_str()) {
                SyncDirection::UpToDate
            } else {
                SyncDirection::NeverSynced
            };
        };

        let local_moved = live_hash != Some(tracked.content_hash.as_str());
        let remote_moved = remote.content_hash != tracked.content_hash;
        match (local_moved, remote_moved) {
            (false, false) => SyncDirection::UpToDate,
            (true, false) => SyncDirection::LocalAhead,
            (false, true) => SyncDirection::RemoteAhead,
            (true, true) => SyncDirection::Diverged,
        }
    }

    /// Short label for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDirection::UpToDate => "up to date",
            SyncDirection::LocalAhead => "local changes to push",
            SyncDirection::RemoteAhead => "remote changes to pull",
            SyncDirection::Diverged => "diverged",
            SyncDirection::NeverSynced => "never synced",
            SyncDirection::RemoteEmpty => "remote empty",
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only snapshot of one project's sync position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// State published on the remote.
    pub remote_state: Option<SyncState>,
    /// Tracked state of this installation.
    pub local_state: Option<SyncState>,
    /// Hash of the live local blob, `None` if there is none yet.
    pub live_hash: Option<String>,
    /// Lock marker currently on the remote, expired or not.
    pub lock: Option<LockRecord>,
    /// Derived direction.
    pub direction: SyncDirection,
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobsync_protocol::WriterId;

    fn state(hash: &str) -> SyncState {
        SyncState::new(hash, WriterId::new("w").unwrap(), 1)
    }

    #[test]
    fn conflict_display() {
        let conflict = SyncConflict {
            remote_state: state("r1"),
            local_state: Some(state("l1")),
        };
        assert_eq!(conflict.to_string(), "remote r1 by w, local l1");
    }

    #[test]
    fn failed_outcome_copies_conflict() {
        let conflict = SyncConflict {
            remote_state: state("r1"),
            local_state: None,
        };
        let outcome = SyncOutcome::failed(SyncError::Conflict(Box::new(conflict.clone())));
        assert!(!outcome.success);
        assert!(outcome.is_conflict());
        assert_eq!(outcome.conflict, Some(conflict));
        assert!(outcome.error_message().unwrap().contains("diverged"));

        let outcome = SyncOutcome::succeeded(Some(state("r1")), true);
        assert!(outcome.success);
        assert!(outcome.error_message().is_none());
    }

    #[test]
    fn direction_table() {
        let (a, b) = (state("a"), state("b"));
        assert_eq!(SyncDirection::derive(None, None, Some("a")), SyncDirection::RemoteEmpty);
        assert_eq!(SyncDirection::derive(Some(&a), None, Some("x")), SyncDirection::NeverSynced);
        assert_eq!(SyncDirection::derive(Some(&a), None, Some("a")), SyncDirection::UpToDate);
        assert_eq!(SyncDirection::derive(Some(&a), Some(&a), Some("a")), SyncDirection::UpToDate);
        assert_eq!(SyncDirection::derive(Some(&a), Some(&a), Some("b")), SyncDirection::LocalAhead);
        assert_eq!(SyncDirection::derive(Some(&b), Some(&a), Some("a")), SyncDirection::RemoteAhead);
        assert_eq!(SyncDirection::derive(Some(&b), Some(&a), Some("c")), SyncDirection::Diverged);
        assert_eq!(SyncDirection::derive(Some(&b), Some(&a), Some("b")), SyncDirection::Diverged);

        assert_eq!(SyncDirection::derive(None, None, None), SyncDirection::RemoteEmpty);
        assert_eq!(SyncDirection::derive(Some(&a), None, None), SyncDirection::NeverSynced);
        assert_eq!(SyncDirection::derive(Some(&a), Some(&a), None), SyncDirection::LocalAhead);
        assert_eq!(SyncDirection::derive(Some(&b), Some(&a), None), SyncDirection::Diverged);
    }

    #[test]
    fn status_serializes_camel_case() {
        let status = SyncStatus {
            remote_state: Some(state("a")),
            local_state: None,
            live_hash: None,
            lock: None,
            direction: SyncDirection::NeverSynced,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["remoteState"]["contentHash"], "a");
        assert_eq!(json["direction"], "never-synced");
        assert!(json["lock"].is_null());
        assert!(json["liveHash"].is_null());
    }
}
