pub mod disk;
pub mod entry;
pub mod memory;
pub mod store;

pub use disk::DiskBackend;
pub use entry::{cache_key, CacheEntry};
pub use memory::{MemoryBackend, DEFAULT_MAX_ENTRIES};
pub use store::{CacheBackend, CacheStats, CacheStore};
