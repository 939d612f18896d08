use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical library identifier of the form `/owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LibraryId(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryIdError {
    #[error("Library id must start with '/': {0}")]
    MissingLeadingSlash(String),
    #[error("Library id must have the form /owner/name: {0}")]
    Malformed(String),
}

impl LibraryId {
    pub fn parse(raw: &str) -> Result<Self, LibraryIdError> {
        let trimmed = raw.trim();
        let rest = trimmed
            .strip_prefix('/')
            .ok_or_else(|| LibraryIdError::MissingLeadingSlash(raw.to_string()))?;

        let mut segments = rest.split('/');
        let owner = segments.next().unwrap_or_default();
        let name = segments.next().unwrap_or_default();
        if owner.is_empty() || name.is_empty() || segments.next().is_some() {
            return Err(LibraryIdError::Malformed(raw.to_string()));
        }

        Ok(LibraryId(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The trailing `name` segment.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }
}

impl TryFrom<String> for LibraryId {
    type Error = LibraryIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        LibraryId::parse(&value)
    }
}

impl From<LibraryId> for String {
    fn from(id: LibraryId) -> Self {
        id.0
    }
}

impl fmt::Display for LibraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
