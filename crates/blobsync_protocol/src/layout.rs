//! Remote file layout of one project.
//!
//! ```text
//! /<sync-root>/<project-id>/
//! ├─ db              # committed state blob
//! ├─ db.uploading    # staging file, only present mid-push
//! ├─ state           # SyncState record (JSON)
//! └─ lock            # LockRecord (JSON), only present mid-push
//! ```

use crate::error::{ProtocolError, ProtocolResult};

/// Suffix appended to the blob path for the staging upload.
pub const DEFAULT_STAGING_SUFFIX: &str = ".uploading";

const DB_FILE: &str = "db";
const STATE_FILE: &str = "state";
const LOCK_FILE: &str = "lock";

/// Paths of the remote files belonging to one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayout {
    segments: Vec<String>,
    staging_suffix: String,
}

impl RemoteLayout {
    /// Creates the layout for `project_id` below `sync_root`.
    ///
    /// `sync_root` may span several directories (`apps/bookings`);
    /// `project_id` must be a single path component.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidPathComponent`] if the project id is
    /// empty, contains `/`, or is a relative component like `..`.
    pub fn new(sync_root: &str, project_id: &str) -> ProtocolResult<Self> {
        let mut segments = Vec::new();
        for part in sync_root.split('/').filter(|p| !p.is_empty()) {
            segments.push(check_component(part)?.to_string());
        }
        if project_id.contains('/') {
            return Err(ProtocolError::InvalidPathComponent(project_id.to_string()));
        }
        segments.push(check_component(project_id)?.to_string());

        Ok(Self {
            segments,
            staging_suffix: DEFAULT_STAGING_SUFFIX.to_string(),
        })
    }

    /// Overrides the staging suffix.
    #[must_use]
    pub fn with_staging_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.staging_suffix = suffix.into();
        self
    }

    /// The project directory, e.g. `/blobsync/hotel-main`.
    pub fn dir(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// Every directory from the outermost down to the project directory.
    ///
    /// Creating these in order builds the skeleton on hosts that refuse to
    /// create intermediate collections implicitly.
    pub fn dir_chain(&self) -> Vec<String> {
        (1..=self.segments.len())
            .map(|n| format!("/{}", self.segments[..n].join("/")))
            .collect()
    }

    /// The committed blob.
    pub fn db(&self) -> String {
        self.file(DB_FILE)
    }

    /// The staging upload target.
    pub fn staging(&self) -> String {
        format!("{}{}", self.db(), self.staging_suffix)
    }

    /// The published state record.
    pub fn state(&self) -> String {
        self.file(STATE_FILE)
    }

    /// The lock marker.
    pub fn lock(&self) -> String {
        self.file(LOCK_FILE)
    }

    fn file(&self, name: &str) -> String {
        format!("{}/{}", self.dir(), name)
    }
}

fn check_component(part: &str) -> ProtocolResult<&str> {
    let trimmed = part.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." || trimmed.contains('\\') {
        return Err(ProtocolError::InvalidPathComponent(part.to_string()));
    }
    Ok(trimmed)
}
