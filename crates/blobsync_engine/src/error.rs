//! Error types for the sync engine.

use crate::http::DavMethod;
use crate::outcome::SyncConflict;
use blobsync_protocol::{ProtocolError, WriterId};
use std::io;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Sync is not configured (missing remote URL, credentials or project).
    #[error("sync is not configured: {0}")]
    NotConfigured(String),

    /// A valid lock held by another installation blocks the push.
    #[error("remote is locked by {holder} until {expires_at_ms}")]
    LockContention {
        /// Installation holding the lock.
        holder: WriterId,
        /// Epoch milliseconds at which the lock lapses.
        expires_at_ms: u64,
    },

    /// Local and remote changes diverged from the last common state.
    #[error("remote and local changes diverged: {0}")]
    Conflict(Box<SyncConflict>),

    /// Downloaded bytes do not match the published hash.
    #[error("integrity check failed: expected {expected}, downloaded {actual}")]
    Integrity {
        /// Hash declared by the remote state.
        expected: String,
        /// Hash of the bytes actually downloaded.
        actual: String,
    },

    /// Non-success response or network failure from the remote host.
    #[error("transport error: {operation} {path}: {message}")]
    Transport {
        /// The WebDAV verb that failed.
        operation: DavMethod,
        /// Remote path of the request.
        path: String,
        /// HTTP status, if a response was received.
        status: Option<u16>,
        /// Error message or response body excerpt.
        message: String,
    },

    /// A remote or local record could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// The application failed to export or load its state blob.
    #[error("blob error: {0}")]
    Blob(String),

    /// The local tracked-state store failed.
    #[error("local state error: {0}")]
    LocalState(String),

    /// Another process already holds the local tracked-state store.
    #[error("local state store is locked by another process")]
    StoreLocked,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Coarse classification of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    /// Missing or invalid configuration.
    Config,
    /// Foreign lock in place.
    LockContention,
    /// Divergent histories.
    Conflict,
    /// Hash mismatch on download.
    Integrity,
    /// Remote host failure or unreadable remote data.
    Transport,
    /// Local persistence or application blob failure.
    Local,
}

impl SyncError {
    /// Creates a transport error for a request that got no response.
    pub fn network(operation: DavMethod, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            operation,
            path: path.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Creates a transport error for a non-success response.
    pub fn status(
        operation: DavMethod,
        path: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::Transport {
            operation,
            path: path.into(),
            status: Some(status),
            message: message.into(),
        }
    }

    /// Returns the taxonomy bucket of this error.
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            SyncError::NotConfigured(_) => SyncErrorKind::Config,
            SyncError::LockContention { .. } => SyncErrorKind::LockContention,
            SyncError::Conflict(_) => SyncErrorKind::Conflict,
            SyncError::Integrity { .. } => SyncErrorKind::Integrity,
            SyncError::Transport { .. } | SyncError::Codec(_) => SyncErrorKind::Transport,
            SyncError::Blob(_)
            | SyncError::LocalState(_)
            | SyncError::StoreLocked
            | SyncError::Io(_) => SyncErrorKind::Local,
        }
    }

    /// Returns the conflict payload if this is a conflict.
    pub fn conflict(&self) -> Option<&SyncConflict> {
        match self {
            SyncError::Conflict(conflict) => Some(conflict),
            _ => None,
        }
    }

    /// Returns true if repeating the call later may succeed.
    ///
    /// The engine never retries on its own; this is a hint for callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { status, .. } => status.map_or(true, |s| s >= 500 || s == 423),
            SyncError::LockContention { .. } => true,
            _ => false,
        }
    }
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidPathComponent(_) | ProtocolError::InvalidWriterId(_) => {
                SyncError::NotConfigured(err.to_string())
            }
            _ => SyncError::Codec(err.to_string()),
        }
    }
}
