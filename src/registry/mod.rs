//! Library registry: a copy-on-refresh snapshot of known libraries, seeded at
//! startup and merged with a remote feed at most once per refresh interval.

pub mod feed;
pub mod seed;

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::RefreshError;
use crate::fetch::http::{get_with_timeout, HttpClient};
use crate::types::{LibraryId, LibraryRecord};
pub use feed::{parse_feed, FeedEntryError, ParsedFeed};
pub use seed::builtin_libraries;

/// An immutable view of the registry.
///
/// Records iterate in insertion order; replacing a record keeps its position.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    records: IndexMap<LibraryId, Arc<LibraryRecord>>,
    name_index: HashMap<String, LibraryId>,
}

impl RegistrySnapshot {
    pub fn from_records(records: impl IntoIterator<Item = LibraryRecord>) -> Self {
        let mut snapshot = Self::default();
        for record in records {
            snapshot.upsert(record);
        }
        snapshot
    }

    /// Insert or replace `record`, keeping the id map and the name index in step.
    fn upsert(&mut self, record: LibraryRecord) {
        let name_key = record.name.to_lowercase();
        if let Some(previous) = self.records.get(&record.id) {
            let previous_key = previous.name.to_lowercase();
            if previous_key != name_key && self.name_index.get(&previous_key) == Some(&record.id) {
                self.name_index.remove(&previous_key);
            }
        }
        self.name_index.insert(name_key, record.id.clone());
        self.records.insert(record.id.clone(), Arc::new(record));
    }

    pub fn get(&self, id: &str) -> Option<&Arc<LibraryRecord>> {
        let id = LibraryId::parse(id).ok()?;
        self.records.get(&id)
    }

    /// Lookup by lower-cased display name.
    pub fn get_by_name(&self, name: &str) -> Option<&Arc<LibraryRecord>> {
        let id = self.name_index.get(&name.to_lowercase())?;
        self.records.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<LibraryRecord>> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn name_index_len(&self) -> usize {
        self.name_index.len()
    }
}

#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// `None` keeps the registry on its seed set forever.
    pub feed_url: Option<String>,
    pub refresh_interval: Duration,
    pub http_timeout: Duration,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            feed_url: None,
            refresh_interval: Duration::from_secs(24 * 60 * 60),
            http_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub unique_libraries: usize,
    pub name_index_entries: usize,
    pub last_refresh: Option<DateTime<Utc>>,
}

pub struct Registry {
    snapshot: ArcSwap<RegistrySnapshot>,
    http: Arc<dyn HttpClient>,
    options: RegistryOptions,
    clock: Arc<dyn Clock>,
    last_refresh: Mutex<Option<DateTime<Utc>>>,
    refresh_guard: tokio::sync::Mutex<()>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl Registry {
    /// A registry seeded with the built-in libraries.
    pub fn new(http: Arc<dyn HttpClient>, options: RegistryOptions) -> Self {
        Self::with_seed(builtin_libraries(), http, options)
    }

    pub fn with_seed(
        seed: impl IntoIterator<Item = LibraryRecord>,
        http: Arc<dyn HttpClient>,
        options: RegistryOptions,
    ) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(RegistrySnapshot::from_records(seed)),
            http,
            options,
            clock: Arc::new(SystemClock),
            last_refresh: Mutex::new(None),
            refresh_guard: tokio::sync::Mutex::new(()),
            refresh_task: Mutex::new(None),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The current snapshot. Never observes a half-applied refresh.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.load_full()
    }

    pub fn get_by_id(&self, id: &str) -> Option<Arc<LibraryRecord>> {
        self.snapshot.load().get(id).cloned()
    }

    /// [`Registry::get_by_id`] after making sure the snapshot is fresh.
    pub async fn lookup(&self, id: &str) -> Option<Arc<LibraryRecord>> {
        self.ensure_fresh().await;
        self.get_by_id(id)
    }

    /// Insert or replace a single record.
    pub fn upsert(&self, record: LibraryRecord) {
        self.snapshot.rcu(|current| {
            let mut next = RegistrySnapshot::clone(current);
            next.upsert(record.clone());
            next
        });
    }

    fn needs_refresh(&self) -> bool {
        if self.options.feed_url.is_none() {
            return false;
        }
        match *self.last_refresh.lock() {
            None => true,
            Some(last) => {
                let interval = chrono::Duration::from_std(self.options.refresh_interval)
                    .unwrap_or_else(|_| chrono::Duration::days(36_500));
                self.clock.now().signed_duration_since(last) > interval
            }
        }
    }

    /// Refresh from the remote feed if the interval has elapsed.
    ///
    /// Concurrent callers do not stack refreshes: the first one through the
    /// guard refreshes, the rest see the updated timestamp and return.
    pub async fn ensure_fresh(&self) {
        if !self.needs_refresh() {
            return;
        }
        let _guard = self.refresh_guard.lock().await;
        if !self.needs_refresh() {
            return;
        }
        if let Err(e) = self.refresh_from_remote().await {
            warn!(error = %e, "registry refresh failed, keeping current snapshot");
        }
    }

    /// Refresh now regardless of the interval.
    pub async fn refresh_now(&self) -> Result<usize, RefreshError> {
        let _guard = self.refresh_guard.lock().await;
        self.refresh_from_remote().await
    }

    /// Caller must hold `refresh_guard`.
    async fn refresh_from_remote(&self) -> Result<usize, RefreshError> {
        let Some(url) = self.options.feed_url.as_deref() else {
            return Ok(0);
        };
        info!(url, "refreshing library registry");

        let body = get_with_timeout(self.http.as_ref(), url, self.options.http_timeout).await?;
        let now = self.clock.now();
        let ParsedFeed { records, skipped } = parse_feed(&body, now)?;

        let applied = records.len();
        // Merge, never retract: entries missing from the feed stay.
        self.snapshot.rcu(|current| {
            let mut next = RegistrySnapshot::clone(current);
            for record in &records {
                next.upsert(record.clone());
            }
            next
        });
        *self.last_refresh.lock() = Some(now);

        info!(
            applied,
            skipped,
            libraries = self.snapshot.load().len(),
            "registry refreshed"
        );
        Ok(applied)
    }

    /// Run [`Registry::ensure_fresh`] on a fixed period until [`Registry::close`].
    pub fn spawn_refresh_task(self: &Arc<Self>) {
        let period = self.options.refresh_interval.max(Duration::from_secs(1));
        let weak: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(registry) = weak.upgrade() else {
                    break;
                };
                registry.ensure_fresh().await;
            }
            debug!("registry refresh task stopped");
        });

        if let Some(previous) = self.refresh_task.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Stop the background refresh task, if any.
    pub fn close(&self) {
        if let Some(handle) = self.refresh_task.lock().take() {
            handle.abort();
        }
    }

    pub fn stats(&self) -> RegistryStats {
        let snapshot = self.snapshot.load();
        RegistryStats {
            unique_libraries: snapshot.len(),
            name_index_entries: snapshot.name_index_len(),
            last_refresh: *self.last_refresh.lock(),
        }
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.close();
    }
}
