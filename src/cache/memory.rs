use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use super::entry::CacheEntry;
use super::store::CacheBackend;
use crate::error::CacheError;

pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Bounded in-process backend.
///
/// On overflow the oldest tenth of the entries by `created_at` is dropped.
/// Reads do not refresh an entry's position: this is insertion-age eviction,
/// not LRU.
#[derive(Debug)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, CacheEntry>>,
    max_entries: usize,
}

impl MemoryBackend {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    fn evict_oldest(entries: &mut HashMap<String, CacheEntry>, count: usize) {
        let mut by_age: Vec<(&String, &CacheEntry)> = entries.iter().collect();
        by_age.sort_by(|(ka, a), (kb, b)| a.created_at.cmp(&b.created_at).then_with(|| ka.cmp(kb)));

        let victims: Vec<String> = by_age
            .into_iter()
            .take(count)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &victims {
            entries.remove(key);
        }
        debug!(evicted = victims.len(), "memory cache overflow");
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn store(&self, key: &str, entry: CacheEntry) -> Result<(), CacheError> {
        let mut entries = self.entries.lock();
        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            let tenth = (self.max_entries + 9) / 10;
            Self::evict_oldest(&mut entries, tenth);
        }
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn remove_if_unchanged(&self, key: &str, seen: &CacheEntry) -> Result<bool, CacheError> {
        let mut entries = self.entries.lock();
        if entries.get(key) != Some(seen) {
            return Ok(false);
        }
        entries.remove(key);
        Ok(true)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.entries.lock().clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize, CacheError> {
        Ok(self.entries.lock().len())
    }
}
