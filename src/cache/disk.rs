use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;

use super::entry::CacheEntry;
use super::store::CacheBackend;
use crate::error::CacheError;

const ENTRY_EXTENSION: &str = "json";

/// Persistent backend: one JSON file per key under `root`.
///
/// Files are named by the SHA-256 of the key and written to a temp file
/// first, then renamed into place, so readers never observe a partial entry.
/// Writes and removals are serialized so a conditional removal cannot race a
/// replacement.
#[derive(Debug)]
pub struct DiskBackend {
    root: PathBuf,
    write_seq: AtomicU64,
    write_lock: Mutex<()>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    entry: CacheEntry,
}

impl DiskBackend {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            write_seq: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let stem = hex::encode(hasher.finalize());
        self.root.join(format!("{stem}.{ENTRY_EXTENSION}"))
    }

    async fn read_entry(&self, path: &Path, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredEntry = serde_json::from_slice(&bytes)?;

        // A hash collision would surface as a different key in the file.
        if stored.key != key {
            warn!(key, stored_key = %stored.key, "cache file key mismatch");
            return Ok(None);
        }
        Ok(Some(stored.entry))
    }

    async fn remove_file(path: &Path) -> Result<(), CacheError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn entry_files(&self) -> Result<Vec<PathBuf>, CacheError> {
        let mut files = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION) {
                files.push(path);
            }
        }
        Ok(files)
    }
}

#[async_trait]
impl CacheBackend for DiskBackend {
    fn kind(&self) -> &'static str {
        "disk"
    }

    async fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        self.read_entry(&self.entry_path(key), key).await
    }

    async fn store(&self, key: &str, entry: CacheEntry) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        let stored = StoredEntry {
            key: key.to_string(),
            entry,
        };
        let bytes = serde_json::to_vec(&stored)?;

        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let temp_path = path.with_extension(format!("tmp.{}.{seq}", std::process::id()));

        let _guard = self.write_lock.lock().await;
        let written = match fs::write(&temp_path, &bytes).await {
            Ok(()) => fs::rename(&temp_path, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;
        Self::remove_file(&self.entry_path(key)).await
    }

    async fn remove_if_unchanged(&self, key: &str, seen: &CacheEntry) -> Result<bool, CacheError> {
        let path = self.entry_path(key);
        let _guard = self.write_lock.lock().await;
        if self.read_entry(&path, key).await?.as_ref() != Some(seen) {
            return Ok(false);
        }
        Self::remove_file(&path).await?;
        Ok(true)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;
        for path in self.entry_files().await? {
            Self::remove_file(&path).await?;
        }
        Ok(())
    }

    async fn len(&self) -> Result<usize, CacheError> {
        Ok(self.entry_files().await?.len())
    }
}
