//! Error types for protocol records.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding remote records.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The record body is not valid JSON for the expected record type.
    #[error("malformed {record} record: {source}")]
    Malformed {
        /// Record type being decoded.
        record: &'static str,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The record could not be serialized.
    #[error("failed to encode {record} record: {source}")]
    Encode {
        /// Record type being encoded.
        record: &'static str,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A writer identifier is empty or contains characters that cannot be stored.
    #[error("invalid writer id: {0:?}")]
    InvalidWriterId(String),

    /// A remote path component is empty or contains a separator.
    #[error("invalid remote path component: {0:?}")]
    InvalidPathComponent(String),
}
