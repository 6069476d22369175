//! Failure points inside a push.
//!
//! Each [`CrashPoint`] arms the host so that one step of the push sequence
//! fails. Tests then check that the committed remote blob and the lock are
//! in the state the push protocol promises.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use blobsync_testkit::{CrashPoint, TestNetwork};
//!
//! let net = TestNetwork::new();
//! CrashPoint::BeforeCommit.arm(&net.host, &net.layout());
//! assert!(!client.push().success);
//! ```

use crate::dav_host::{FaultAction, MemoryDavHost};
use blobsync_engine::{DavMethod, RemoteLayout};

/// A step of the push sequence that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashPoint {
    /// The directory skeleton cannot be created.
    DuringSkeleton,
    /// The lock marker cannot be written.
    DuringLockWrite,
    /// The connection drops while the staging file is uploading.
    DuringStagingUpload,
    /// The staging file is uploaded but the rename is refused.
    BeforeCommit,
    /// The rename succeeded but the state record cannot be written.
    BeforePublish,
}

impl CrashPoint {
    /// Every crash point, in push order.
    pub const ALL: [CrashPoint; 5] = [
        CrashPoint::DuringSkeleton,
        CrashPoint::DuringLockWrite,
        CrashPoint::DuringStagingUpload,
        CrashPoint::BeforeCommit,
        CrashPoint::BeforePublish,
    ];

    /// Installs a one-shot fault on `host` for this point.
    pub fn arm(self, host: &MemoryDavHost, layout: &RemoteLayout) {
        match self {
            CrashPoint::DuringSkeleton => {
                host.fail_times(DavMethod::Mkcol, &layout.dir(), FaultAction::Status(403), 1);
            }
            CrashPoint::DuringLockWrite => {
                host.fail_times(DavMethod::Put, &layout.lock(), FaultAction::Status(507), 1);
            }
            CrashPoint::DuringStagingUpload => {
                host.fail_times(DavMethod::Put, &layout.staging(), FaultAction::Network, 1);
            }
            CrashPoint::BeforeCommit => {
                host.fail_times(DavMethod::Move, &layout.staging(), FaultAction::Status(502), 1);
            }
            CrashPoint::BeforePublish => {
                host.fail_times(DavMethod::Put, &layout.state(), FaultAction::Network, 1);
            }
        }
    }

    /// Returns true if the committed blob is replaced before this point fails.
    pub fn commits(self) -> bool {
        matches!(self, CrashPoint::BeforePublish)
    }

    /// Returns true if the lock was written before this point fails.
    pub fn holds_lock(self) -> bool {
        !matches!(self, CrashPoint::DuringSkeleton | CrashPoint::DuringLockWrite)
    }
}
