use serde::Serialize;
use thiserror::Error;

/// Machine-readable category of a [`DocsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    NoContentAvailable,
    InvalidRequest,
}

/// The only errors that leave the crate.
///
/// Everything else (per-source fetch failures, registry refresh failures,
/// cache backend failures) is logged and absorbed where it happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocsError {
    #[error("Library not found: {0}")]
    NotFound(String),

    #[error("No documentation could be fetched for {0}")]
    NoContentAvailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl DocsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocsError::NotFound(_) => ErrorKind::NotFound,
            DocsError::NoContentAvailable(_) => ErrorKind::NoContentAvailable,
            DocsError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }
}

/// A single source could not produce content. Recovered by skipping the source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Timed out fetching {0}")]
    Timeout(String),

    #[error("Content extraction failed: {0}")]
    Extraction(String),

    #[error("No content found at {0}")]
    Empty(String),
}

/// The remote registry feed could not be applied. Recovered by keeping the
/// previous snapshot.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Registry fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Registry feed is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A cache backend operation failed. Recovered by treating it as a miss or no-op.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
