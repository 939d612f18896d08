use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::identifiers::LibraryId;
use super::library::{LibraryRecord, SourceKind};
use crate::error::DocsError;

/// Content pulled from one source during a single aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentFragment {
    pub source_url: String,
    pub kind: SourceKind,
    pub topic: Option<String>,
    pub text: String,
    pub token_count: usize,
    /// Filled in by the aggregator; fetchers leave it at 0.0.
    pub quality_score: f32,
}

/// Outcome of resolving a free-text library name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionResult {
    pub query: String,
    pub exact_match: Option<LibraryRecord>,
    /// At most ten, most popular first, no duplicate ids.
    pub candidates: Vec<LibraryRecord>,
    pub confidence: f32,
}

/// A documentation request as received from the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct DocumentationRequest {
    pub library_id: String,
    pub topic: Option<String>,
    /// Falls back to the configured default when absent.
    pub tokens: Option<usize>,
    /// Overall deadline for this request in milliseconds. Falls back to the
    /// configured request timeout when absent.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub library_id: LibraryId,
    pub topic: Option<String>,
    pub token_budget: usize,
    pub timeout: Option<Duration>,
}

impl DocumentationRequest {
    pub fn new(library_id: impl Into<String>) -> Self {
        Self {
            library_id: library_id.into(),
            ..Self::default()
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_tokens(mut self, tokens: usize) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn validate(
        &self,
        default_tokens: usize,
        max_tokens: usize,
    ) -> Result<ValidatedRequest, DocsError> {
        let raw_id = self.library_id.trim();
        if raw_id.is_empty() {
            return Err(DocsError::InvalidRequest("library id is required".into()));
        }
        // Ids that do not parse cannot be in the registry.
        let library_id =
            LibraryId::parse(raw_id).map_err(|_| DocsError::NotFound(raw_id.to_string()))?;

        let token_budget = self.tokens.unwrap_or(default_tokens);
        if token_budget == 0 || token_budget > max_tokens {
            return Err(DocsError::InvalidRequest(format!(
                "token budget must be between 1 and {max_tokens}, got {token_budget}"
            )));
        }

        if self.timeout_ms == Some(0) {
            return Err(DocsError::InvalidRequest("timeout must be positive".into()));
        }
        let timeout = self.timeout_ms.map(Duration::from_millis);

        let topic = self
            .topic
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok(ValidatedRequest {
            library_id,
            topic,
            token_budget,
            timeout,
        })
    }
}

/// The final documentation bundle for one library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentationResult {
    pub library_id: LibraryId,
    pub library_name: String,
    pub content: String,
    pub source_urls: Vec<String>,
    pub token_count: usize,
    pub topic: Option<String>,
    pub quality_score: f32,
    /// Set on the read path of a cache hit. Left out of the cached payload.
    #[serde(default)]
    pub served_from_cache: bool,
}

const SERVED_FROM_CACHE_FIELD: &str = "served_from_cache";

impl DocumentationResult {
    pub fn sources_count(&self) -> usize {
        self.source_urls.len()
    }

    /// The JSON stored in the cache: every field except `served_from_cache`.
    pub fn to_cache_value(&self) -> serde_json::Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        if let Some(fields) = value.as_object_mut() {
            fields.remove(SERVED_FROM_CACHE_FIELD);
        }
        Ok(value)
    }
}
