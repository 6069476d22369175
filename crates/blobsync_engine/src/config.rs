//! Configuration for the sync engine.

use crate::error::{SyncError, SyncResult};
use blobsync_protocol::{RemoteLayout, DEFAULT_LOCK_TTL_MS, DEFAULT_STAGING_SUFFIX};
use std::fmt;
use std::time::Duration;

/// Directory on the remote host below which projects live.
pub const DEFAULT_SYNC_ROOT: &str = "blobsync";

/// Configuration for sync operations.
#[derive(Clone)]
pub struct SyncConfig {
    /// Base URL of the WebDAV host (e.g. `https://cloud.example.com/remote.php/dav/files/me`).
    pub remote_url: String,
    /// Basic auth user name.
    pub username: String,
    /// Basic auth password.
    pub password: String,
    /// Directory below the base URL that holds all projects.
    pub sync_root: String,
    /// Project identifier, the last component of the remote project path.
    pub project_id: String,
    /// How long a push lock stays valid without being released.
    pub lock_ttl: Duration,
    /// Request timeout for HTTP clients that honor it.
    pub timeout: Duration,
    /// Suffix of the staging upload next to the committed blob.
    pub staging_suffix: String,
}

impl SyncConfig {
    /// Creates a new sync configuration.
    pub fn new(
        remote_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            remote_url: remote_url.into(),
            username: username.into(),
            password: password.into(),
            sync_root: DEFAULT_SYNC_ROOT.to_string(),
            project_id: project_id.into(),
            lock_ttl: Duration::from_millis(DEFAULT_LOCK_TTL_MS),
            timeout: Duration::from_secs(30),
            staging_suffix: DEFAULT_STAGING_SUFFIX.to_string(),
        }
    }

    /// Sets the remote sync root directory.
    pub fn with_sync_root(mut self, sync_root: impl Into<String>) -> Self {
        self.sync_root = sync_root.into();
        self
    }

    /// Sets the lock time-to-live.
    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the staging suffix.
    pub fn with_staging_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.staging_suffix = suffix.into();
        self
    }

    /// Lock TTL in milliseconds.
    pub fn lock_ttl_ms(&self) -> u64 {
        u64::try_from(self.lock_ttl.as_millis()).unwrap_or(u64::MAX)
    }

    /// Checks that everything needed to talk to the remote host is present.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotConfigured`] naming the first missing or
    /// invalid setting.
    pub fn validate(&self) -> SyncResult<()> {
        let url = self.remote_url.trim();
        if url.is_empty() {
            return Err(SyncError::NotConfigured("remote URL is not set".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SyncError::NotConfigured(format!(
                "remote URL must be http(s): {url}"
            )));
        }
        if self.username.is_empty() || self.password.is_empty() {
            return Err(SyncError::NotConfigured("credentials are not set".into()));
        }
        if self.lock_ttl.is_zero() {
            return Err(SyncError::NotConfigured("lock TTL must be positive".into()));
        }
        if self.staging_suffix.is_empty() || self.staging_suffix.contains('/') {
            return Err(SyncError::NotConfigured(format!(
                "invalid staging suffix: {:?}",
                self.staging_suffix
            )));
        }
        self.layout().map(|_| ())
    }

    /// Builds the remote layout of the configured project.
    pub fn layout(&self) -> SyncResult<RemoteLayout> {
        if self.project_id.trim().is_empty() {
            return Err(SyncError::NotConfigured("project id is not set".into()));
        }
        Ok(RemoteLayout::new(&self.sync_root, &self.project_id)?
            .with_staging_suffix(self.staging_suffix.clone()))
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("remote_url", &self.remote_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("sync_root", &self.sync_root)
            .field("project_id", &self.project_id)
            .field("lock_ttl", &self.lock_ttl)
            .field("timeout", &self.timeout)
            .field("staging_suffix", &self.staging_suffix)
            .finish()
    }
}
