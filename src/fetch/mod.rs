pub mod extract;
pub mod http;
pub mod strategy;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::aggregate::{TokenCounter, WordPunctTokenCounter};
use crate::error::{DocsError, FetchError};
use crate::types::{ContentFragment, LibraryRecord, SourceSpec};
pub use extract::{clean_markdown, ContentExtractor, TagStripExtractor};
pub use http::{get_with_timeout, HttpClient, ReqwestClient};
pub use strategy::{fetch_source, topic_slug, FetchContext, FetchedText};

/// Pulls content from a library's sources in priority order until the token
/// budget is covered.
pub struct SourceOrchestrator<T = WordPunctTokenCounter> {
    http: Arc<dyn HttpClient>,
    extractor: Arc<dyn ContentExtractor>,
    tokenizer: T,
    fetch_timeout: Duration,
}

impl SourceOrchestrator<WordPunctTokenCounter> {
    pub fn new(
        http: Arc<dyn HttpClient>,
        extractor: Arc<dyn ContentExtractor>,
        fetch_timeout: Duration,
    ) -> Self {
        Self::with_tokenizer(http, extractor, WordPunctTokenCounter, fetch_timeout)
    }
}

impl<T: TokenCounter + Send + Sync> SourceOrchestrator<T> {
    pub fn with_tokenizer(
        http: Arc<dyn HttpClient>,
        extractor: Arc<dyn ContentExtractor>,
        tokenizer: T,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            http,
            extractor,
            tokenizer,
            fetch_timeout,
        }
    }

    /// Fetch fragments for `library`, highest priority first.
    ///
    /// A failing source is logged and skipped. Fetching stops once the
    /// fragments gathered so far reach `token_budget`, or when `deadline`
    /// passes; in the latter case whatever was gathered is returned.
    pub async fn fetch_all(
        &self,
        library: &LibraryRecord,
        topic: Option<&str>,
        token_budget: usize,
        deadline: Option<Instant>,
    ) -> Result<Vec<ContentFragment>, DocsError> {
        let mut sources: Vec<&SourceSpec> =
            library.sources.iter().filter(|s| s.enabled).collect();
        // Stable: equal priorities keep registry order.
        sources.sort_by_key(|s| s.priority);

        let mut fragments: Vec<ContentFragment> = Vec::new();
        for source in sources {
            let timeout = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        warn!(
                            library_id = %library.id,
                            "request deadline reached, returning partial results"
                        );
                        break;
                    }
                    left.min(self.fetch_timeout)
                }
                None => self.fetch_timeout,
            };

            let ctx = FetchContext {
                http: self.http.as_ref(),
                extractor: self.extractor.as_ref(),
                timeout: self.fetch_timeout,
                deadline: Instant::now() + timeout,
            };
            let fetching = fetch_source(&ctx, source, topic);
            let outcome = match tokio::time::timeout(timeout, fetching).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(source.url.clone())),
            };

            let fetched = match outcome {
                Ok(fetched) => fetched,
                Err(e) => {
                    warn!(
                        library_id = %library.id,
                        url = %source.url,
                        kind = %source.kind,
                        error = %e,
                        "source fetch failed"
                    );
                    continue;
                }
            };

            let token_count = self.tokenizer.count_tokens(&fetched.text);
            debug!(url = %fetched.url, tokens = token_count, "fetched fragment");
            fragments.push(ContentFragment {
                source_url: fetched.url,
                kind: source.kind,
                topic: topic.map(str::to_string),
                text: fetched.text,
                token_count,
                quality_score: 0.0,
            });

            let total: usize = fragments.iter().map(|f| f.token_count).sum();
            if total >= token_budget {
                debug!(library_id = %library.id, total, token_budget, "token budget covered");
                break;
            }
        }

        if fragments.is_empty() {
            return Err(DocsError::NoContentAvailable(library.id.to_string()));
        }
        info!(library_id = %library.id, fragments = fragments.len(), "sources fetched");
        Ok(fragments)
    }
}
