//! Writer identity.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A stable identifier for one installation.
///
/// Generated once when the application is installed and persisted by the
/// embedding application. Remote states and locks carry the writer id so a
/// client can tell its own writes apart from foreign ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WriterId(String);

impl WriterId {
    /// Wraps an existing identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidWriterId`] if the value is blank or
    /// contains control characters.
    pub fn new(value: impl Into<String>) -> ProtocolResult<Self> {
        let value = value.into();
        if value.trim().is_empty() || value.chars().any(char::is_control) {
            return Err(ProtocolError::InvalidWriterId(value));
        }
        Ok(Self(value))
    }

    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WriterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for WriterId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WriterId> for String {
    fn from(id: WriterId) -> Self {
        id.0
    }
}

impl std::str::FromStr for WriterId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.trim())
    }
}
