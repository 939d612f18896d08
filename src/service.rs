use std::sync::Arc;

use tokio::time::{timeout, timeout_at, Instant};
use tracing::{info, warn};

use crate::aggregate::Aggregator;
use crate::cache::{cache_key, CacheStats, CacheStore, DiskBackend, MemoryBackend};
use crate::config::Settings;
use crate::error::{DocsError, FetchError};
use crate::fetch::{
    ContentExtractor, HttpClient, ReqwestClient, SourceOrchestrator, TagStripExtractor,
};
use crate::registry::{Registry, RegistryOptions, RegistryStats};
use crate::resolver::{resolve_in, Resolver};
use crate::types::{DocumentationRequest, DocumentationResult, LibraryRecord, ResolutionResult};

pub const DOCS_CACHE_NAMESPACE: &str = "docs";
pub const DEFAULT_TOPIC_KEY: &str = "default";

/// The two operations offered to a protocol dispatcher: resolve a library
/// name, and fetch a documentation bundle for a library id.
pub struct DocsService {
    settings: Settings,
    registry: Arc<Registry>,
    resolver: Resolver,
    orchestrator: SourceOrchestrator,
    aggregator: Aggregator,
    cache: CacheStore,
}

impl DocsService {
    /// Wire up a service from explicit parts.
    pub fn from_parts(
        settings: Settings,
        registry: Arc<Registry>,
        cache: CacheStore,
        http: Arc<dyn HttpClient>,
        extractor: Arc<dyn ContentExtractor>,
    ) -> Self {
        let orchestrator = SourceOrchestrator::new(http, extractor, settings.http_timeout());
        Self {
            resolver: Resolver::new(Arc::clone(&registry)),
            settings,
            registry,
            orchestrator,
            aggregator: Aggregator::default(),
            cache,
        }
    }

    /// Build the default stack from `settings`: a `reqwest` client, the
    /// built-in registry with background refresh, and a disk or memory cache.
    ///
    /// Must be called inside a tokio runtime.
    pub async fn from_settings(settings: Settings) -> Result<Self, FetchError> {
        let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new(&settings.user_agent)?);

        let registry = Arc::new(Registry::new(
            Arc::clone(&http),
            RegistryOptions {
                feed_url: settings.registry_url.clone(),
                refresh_interval: settings.registry_refresh_interval(),
                http_timeout: settings.http_timeout(),
            },
        ));
        if settings.registry_url.is_some() {
            registry.spawn_refresh_task();
        }

        let memory = || MemoryBackend::new(settings.cache_max_entries);
        let cache = match &settings.cache_dir {
            Some(dir) => match DiskBackend::open(dir).await {
                Ok(backend) => {
                    info!(dir = %dir.display(), "using disk cache");
                    CacheStore::new(backend, settings.cache_ttl())
                }
                Err(e) => {
                    warn!(
                        dir = %dir.display(),
                        error = %e,
                        "disk cache unavailable, using in-memory cache"
                    );
                    CacheStore::new(memory(), settings.cache_ttl())
                }
            },
            None => CacheStore::new(memory(), settings.cache_ttl()),
        };

        Ok(Self::from_parts(settings, registry, cache, http, Arc::new(TagStripExtractor)))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub async fn resolve(&self, library_name: &str) -> Result<ResolutionResult, DocsError> {
        if library_name.trim().is_empty() {
            return Err(DocsError::InvalidRequest("library name is required".into()));
        }
        let resolving = self.resolver.resolve(library_name);
        let result = match timeout(self.settings.request_timeout(), resolving).await {
            Ok(result) => result,
            Err(_) => {
                warn!(query = %library_name, "registry refresh outran the request timeout");
                resolve_in(&self.registry.snapshot(), library_name)
            }
        };
        info!(
            query = %library_name,
            exact = result.exact_match.is_some(),
            candidates = result.candidates.len(),
            confidence = result.confidence,
            "resolved library"
        );
        Ok(result)
    }

    /// Serve a documentation bundle, from cache when possible.
    ///
    /// The request deadline starts here and covers the registry lookup as
    /// well as every source fetch.
    pub async fn fetch_documentation(
        &self,
        request: DocumentationRequest,
    ) -> Result<DocumentationResult, DocsError> {
        let request = request.validate(
            self.settings.default_token_limit,
            self.settings.max_token_limit,
        )?;
        let now = Instant::now();
        let deadline = request
            .timeout
            .and_then(|allowed| now.checked_add(allowed))
            .unwrap_or_else(|| now + self.settings.request_timeout());
        let library_id = request.library_id.as_str();
        let topic = request.topic.as_deref();

        let budget = request.token_budget.to_string();
        let key = cache_key(
            DOCS_CACHE_NAMESPACE,
            [library_id, topic.unwrap_or(DEFAULT_TOPIC_KEY), budget.as_str()],
        );

        if let Some(mut cached) = self.cache.get_as::<DocumentationResult>(&key).await {
            info!(library_id, "serving documentation from cache");
            cached.served_from_cache = true;
            return Ok(cached);
        }

        let library = self
            .lookup_within(library_id, deadline)
            .await
            .ok_or_else(|| DocsError::NotFound(library_id.to_string()))?;

        let fragments = self
            .orchestrator
            .fetch_all(&library, topic, request.token_budget, Some(deadline))
            .await?;

        let combined = self.aggregator.combine(fragments, request.token_budget);
        let result = DocumentationResult {
            library_id: library.id.clone(),
            library_name: library.name.clone(),
            source_urls: combined.included.iter().map(|f| f.source_url.clone()).collect(),
            content: combined.content,
            token_count: combined.token_count,
            topic: request.topic.clone(),
            quality_score: combined.quality_score,
            served_from_cache: false,
        };

        match result.to_cache_value() {
            Ok(payload) => self.cache.set(&key, payload, Some(self.settings.cache_ttl())).await,
            Err(e) => warn!(library_id, error = %e, "documentation result not cacheable"),
        }
        info!(
            library_id,
            tokens = result.token_count,
            sources = result.sources_count(),
            truncated = combined.truncated,
            "documentation assembled"
        );
        Ok(result)
    }

    /// Registry lookup that stops waiting on a refresh at `deadline` and
    /// answers from the current snapshot instead.
    async fn lookup_within(
        &self,
        library_id: &str,
        deadline: Instant,
    ) -> Option<Arc<LibraryRecord>> {
        match timeout_at(deadline, self.registry.lookup(library_id)).await {
            Ok(found) => found,
            Err(_) => {
                warn!(library_id, "registry refresh outran the request deadline");
                self.registry.get_by_id(library_id)
            }
        }
    }

    /// Convenience wrapper over [`DocsService::fetch_documentation`].
    pub async fn fetch(
        &self,
        library_id: &str,
        topic: Option<&str>,
        tokens: Option<usize>,
    ) -> Result<DocumentationResult, DocsError> {
        self.fetch_documentation(DocumentationRequest {
            library_id: library_id.to_string(),
            topic: topic.map(str::to_string),
            tokens,
            timeout_ms: None,
        })
        .await
    }

    pub fn registry_stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Stop background work. The service stays usable for reads.
    pub fn close(&self) {
        self.registry.close();
    }
}
