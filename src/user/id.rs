//! ID logic management.

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

const ID_BYTES: usize = 12;

#[derive(Debug, thiserror::Error)]
#[error("id must be {len} hexadecimal characters, got `{0}`", len = ID_BYTES * 2)]
pub struct InvalidRecordId(String);

/// Value object of a document identifier.
///
/// 12 random bytes, rendered as 24 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    /// Generate a new random [`RecordId`].
    pub fn generate() -> Self {
        let mut bytes = [0u8; ID_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Converts a [`String`] into a valid [`RecordId`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if the string is not 24 hexadecimal characters.
    pub fn parse(id: impl Into<String>) -> Result<Self, InvalidRecordId> {
        let id = id.into();
        let normalized = id.trim().to_lowercase();

        if normalized.len() != ID_BYTES * 2
            || !normalized.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(InvalidRecordId(id));
        }

        Ok(Self(normalized))
    }

    /// Returns the same string as a string slice `&str`.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RecordId {
    type Error = InvalidRecordId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}
