use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::json;
use sha2::{Digest, Sha256};
use tempfile::tempdir;
use tokio::sync::Notify;

use context_docs::cache::{
    cache_key, CacheBackend, CacheEntry, CacheStore, DiskBackend, MemoryBackend,
};
use context_docs::clock::ManualClock;
use context_docs::error::CacheError;

fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()))
}

fn memory_store(clock: Arc<ManualClock>, max_entries: usize) -> CacheStore {
    CacheStore::with_clock(MemoryBackend::new(max_entries), Duration::from_secs(3600), clock)
}

#[tokio::test]
async fn set_then_get_returns_value() {
    let store = memory_store(manual_clock(), 100);
    let value = json!({"data": "test_value", "number": 42});

    store.set("test:key", value.clone(), Some(Duration::from_secs(60))).await;

    assert_eq!(store.get("test:key").await, Some(value));
    assert_eq!(store.get("nonexistent:key").await, None);
}

#[tokio::test]
async fn expired_entry_is_absent_and_physically_removed() {
    let clock = manual_clock();
    let store = memory_store(Arc::clone(&clock), 100);

    store.set("k", json!("v"), Some(Duration::from_secs(60))).await;
    clock.advance(chrono::Duration::seconds(60));
    assert_eq!(store.get("k").await, Some(json!("v")), "entry is live up to expires_at");

    clock.advance(chrono::Duration::seconds(1));
    assert_eq!(store.get("k").await, None);
    assert_eq!(store.stats().await.entries, Some(0), "expired entry must be removed on read");
}

#[tokio::test]
async fn set_overwrites_and_default_ttl_applies() {
    let clock = manual_clock();
    let store = memory_store(Arc::clone(&clock), 100);

    store.set("k", json!(1), None).await;
    store.set("k", json!(2), None).await;
    assert_eq!(store.get("k").await, Some(json!(2)));

    clock.advance(chrono::Duration::seconds(3599));
    assert_eq!(store.get("k").await, Some(json!(2)));
    clock.advance(chrono::Duration::seconds(2));
    assert_eq!(store.get("k").await, None);
}

#[tokio::test]
async fn zero_ttl_is_not_stored() {
    let store = memory_store(manual_clock(), 100);
    store.set("k", json!(1), Some(Duration::ZERO)).await;
    assert_eq!(store.get("k").await, None);
}

#[tokio::test]
async fn delete_and_clear() {
    let store = memory_store(manual_clock(), 100);
    store.set("key1", json!("value1"), None).await;
    store.set("key2", json!("value2"), None).await;

    store.delete("key1").await;
    assert_eq!(store.get("key1").await, None);
    assert_eq!(store.get("key2").await, Some(json!("value2")));

    store.clear().await;
    assert_eq!(store.get("key2").await, None);
    assert_eq!(store.stats().await.entries, Some(0));
}

#[tokio::test]
async fn memory_backend_evicts_oldest_tenth_by_creation_time() {
    let clock = manual_clock();
    let store = memory_store(Arc::clone(&clock), 20);

    for i in 0..20 {
        store.set(&format!("k{i:02}"), json!(i), None).await;
        clock.advance(chrono::Duration::seconds(1));
    }
    // Reading the oldest entries does not protect them: not LRU.
    assert_eq!(store.get("k00").await, Some(json!(0)));
    assert_eq!(store.get("k01").await, Some(json!(1)));

    store.set("k20", json!(20), None).await;

    assert_eq!(store.stats().await.entries, Some(19));
    assert_eq!(store.get("k00").await, None);
    assert_eq!(store.get("k01").await, None);
    assert_eq!(store.get("k02").await, Some(json!(2)));
    assert_eq!(store.get("k20").await, Some(json!(20)));
}

#[tokio::test]
async fn overwriting_existing_key_at_capacity_does_not_evict() {
    let store = memory_store(manual_clock(), 10);
    for i in 0..10 {
        store.set(&format!("k{i}"), json!(i), None).await;
    }
    store.set("k5", json!("again"), None).await;
    assert_eq!(store.stats().await.entries, Some(10));
    assert_eq!(store.get("k0").await, Some(json!(0)));
}

#[tokio::test]
async fn typed_round_trip_and_undecodable_payload_is_dropped() {
    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Payload {
        name: String,
        count: u32,
    }

    let store = memory_store(manual_clock(), 10);
    let payload = Payload {
        name: "docs".into(),
        count: 3,
    };
    store.set_as("typed", &payload, None).await;
    assert_eq!(store.get_as::<Payload>("typed").await, Some(payload));

    store.set("typed", json!("not a payload"), None).await;
    assert_eq!(store.get_as::<Payload>("typed").await, None);
    assert_eq!(store.get("typed").await, None);
}

#[tokio::test]
async fn disk_backend_persists_across_reopen() {
    let dir = tempdir().unwrap();
    let clock = manual_clock();

    {
        let backend = DiskBackend::open(dir.path().join("cache")).await.unwrap();
        let ttl = Duration::from_secs(60);
        let store = CacheStore::with_clock(backend, ttl, Arc::clone(&clock) as _);
        store.set("docs:/a/b:default:1000", json!({"content": "x"}), None).await;
    }

    let backend = DiskBackend::open(dir.path().join("cache")).await.unwrap();
    let store = CacheStore::with_clock(backend, Duration::from_secs(60), clock.clone() as _);
    assert_eq!(store.get("docs:/a/b:default:1000").await, Some(json!({"content": "x"})));
    assert_eq!(store.stats().await.backend, "disk");
    assert_eq!(store.stats().await.entries, Some(1));

    clock.advance(chrono::Duration::seconds(61));
    assert_eq!(store.get("docs:/a/b:default:1000").await, None);
    assert_eq!(store.stats().await.entries, Some(0));
}

#[tokio::test]
async fn disk_backend_delete_and_clear() {
    let dir = tempdir().unwrap();
    let backend = DiskBackend::open(dir.path()).await.unwrap();
    let store = CacheStore::new(backend, Duration::from_secs(60));

    store.set("a", json!(1), None).await;
    store.set("b", json!(2), None).await;
    store.delete("a").await;
    store.delete("never-set").await;
    assert_eq!(store.get("a").await, None);
    assert_eq!(store.get("b").await, Some(json!(2)));

    store.clear().await;
    assert_eq!(store.get("b").await, None);
    assert_eq!(store.stats().await.entries, Some(0));
}

struct BrokenBackend;

#[async_trait]
impl CacheBackend for BrokenBackend {
    fn kind(&self) -> &'static str {
        "broken"
    }

    async fn load(&self, _key: &str) -> Result<Option<CacheEntry>, CacheError> {
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "down").into())
    }

    async fn store(&self, _key: &str, _entry: CacheEntry) -> Result<(), CacheError> {
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "down").into())
    }

    async fn remove(&self, _key: &str) -> Result<(), CacheError> {
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "down").into())
    }

    async fn remove_if_unchanged(
        &self,
        _key: &str,
        _seen: &CacheEntry,
    ) -> Result<bool, CacheError> {
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "down").into())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "down").into())
    }

    async fn len(&self) -> Result<usize, CacheError> {
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "down").into())
    }
}

#[tokio::test]
async fn backend_failures_are_misses_and_no_ops() {
    let store = CacheStore::new(BrokenBackend, Duration::from_secs(60));

    store.set("k", json!(1), None).await;
    assert_eq!(store.get("k").await, None);
    store.delete("k").await;
    store.clear().await;

    let stats = store.stats().await;
    assert_eq!(stats.backend, "broken");
    assert_eq!(stats.entries, None);
}

#[test]
fn cache_key_is_colon_joined_and_case_sensitive() {
    assert_eq!(
        cache_key("docs", ["/vercel/next.js", "default", "10000"]),
        "docs:/vercel/next.js:default:10000"
    );
    assert_ne!(
        cache_key("docs", ["/Vercel/next.js", "default", "10000"]),
        cache_key("docs", ["/vercel/next.js", "default", "10000"])
    );
    assert_ne!(
        cache_key("docs", ["/a/b", "routing", "1000"]),
        cache_key("docs", ["/a/b", "default", "1000"])
    );
    assert_eq!(cache_key("ns", Vec::<String>::new()), "ns");
}

/// Memory backend whose next `load` parks after reading until released.
struct ParkingBackend {
    inner: MemoryBackend,
    gate: Arc<Gate>,
}

#[derive(Default)]
struct Gate {
    armed: AtomicBool,
    loaded: Notify,
    release: Notify,
}

#[async_trait]
impl CacheBackend for ParkingBackend {
    fn kind(&self) -> &'static str {
        "parking"
    }

    async fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let entry = self.inner.load(key).await?;
        if self.gate.armed.swap(false, Ordering::SeqCst) {
            self.gate.loaded.notify_one();
            self.gate.release.notified().await;
        }
        Ok(entry)
    }

    async fn store(&self, key: &str, entry: CacheEntry) -> Result<(), CacheError> {
        self.inner.store(key, entry).await
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.inner.remove(key).await
    }

    async fn remove_if_unchanged(&self, key: &str, seen: &CacheEntry) -> Result<bool, CacheError> {
        self.inner.remove_if_unchanged(key, seen).await
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.inner.clear().await
    }

    async fn len(&self) -> Result<usize, CacheError> {
        self.inner.len().await
    }
}

#[tokio::test]
async fn expiry_on_read_does_not_erase_a_concurrent_write() {
    let clock = manual_clock();
    let gate = Arc::new(Gate::default());
    let backend = ParkingBackend {
        inner: MemoryBackend::new(10),
        gate: Arc::clone(&gate),
    };
    let store = Arc::new(CacheStore::with_clock(
        backend,
        Duration::from_secs(3600),
        Arc::clone(&clock) as _,
    ));

    store.set("k", json!("old"), Some(Duration::from_secs(1))).await;
    clock.advance(chrono::Duration::seconds(5));

    gate.armed.store(true, Ordering::SeqCst);
    let reader = tokio::spawn({
        let store = Arc::clone(&store);
        async move { store.get("k").await }
    });
    gate.loaded.notified().await;

    store.set("k", json!("fresh"), Some(Duration::from_secs(60))).await;
    gate.release.notify_one();

    assert_eq!(reader.await.unwrap(), None, "the reader saw the expired entry");
    assert_eq!(store.get("k").await, Some(json!("fresh")));
}

#[tokio::test]
async fn conditional_remove_only_drops_the_entry_that_was_read() {
    let dir = tempdir().unwrap();
    let disk = DiskBackend::open(dir.path()).await.unwrap();
    let memory = MemoryBackend::new(10);
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let entry = |value| CacheEntry {
        value,
        created_at: start,
        expires_at: start + chrono::Duration::seconds(1),
    };

    let backends: [&dyn CacheBackend; 2] = [&disk, &memory];
    for backend in backends {
        backend.store("k", entry(json!("old"))).await.unwrap();
        let seen = backend.load("k").await.unwrap().unwrap();
        backend.store("k", entry(json!("new"))).await.unwrap();

        assert!(!backend.remove_if_unchanged("k", &seen).await.unwrap());
        assert_eq!(backend.load("k").await.unwrap().unwrap().value, json!("new"));

        let current = backend.load("k").await.unwrap().unwrap();
        assert!(backend.remove_if_unchanged("k", &current).await.unwrap());
        assert_eq!(backend.load("k").await.unwrap(), None);
        assert!(!backend.remove_if_unchanged("k", &current).await.unwrap());
    }
}

#[tokio::test]
async fn failed_disk_write_leaves_no_temp_file() {
    let dir = tempdir().unwrap();
    let backend = DiskBackend::open(dir.path()).await.unwrap();
    let store = CacheStore::new(backend, Duration::from_secs(60));

    // A non-empty directory where the entry file belongs makes the rename fail.
    let stem = hex::encode(Sha256::digest(b"blocked"));
    let blocker = dir.path().join(format!("{stem}.json"));
    std::fs::create_dir(&blocker).unwrap();
    std::fs::write(blocker.join("keep"), b"x").unwrap();

    store.set("blocked", json!(1), None).await;

    let leftovers: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|item| item.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.contains(".tmp."))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
    assert_eq!(store.get("blocked").await, None);
}
