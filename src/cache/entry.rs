use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored value and its lifetime.
///
/// `expires_at > created_at` always holds; an entry past `expires_at` is
/// absent whether or not a backend has evicted it yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Build a cache key: `namespace:arg1:arg2:...`.
///
/// Case-sensitive and order-sensitive, so identical logical requests always
/// map to the same key.
pub fn cache_key<I, S>(namespace: &str, args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut key = String::from(namespace);
    for arg in args {
        key.push(':');
        key.push_str(arg.as_ref());
    }
    key
}
