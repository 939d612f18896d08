use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::types::{
    LibraryId, LibraryIdError, LibraryRecord, SourceKind, SourceSpec, DEFAULT_SOURCE_TTL_SECONDS,
};

const DEFAULT_POPULARITY: f32 = 0.5;

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    libraries: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    documentation_sources: Vec<FeedSource>,
    #[serde(default)]
    repository_url: Option<String>,
    #[serde(default)]
    package_manager: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default = "default_popularity")]
    popularity_score: f32,
}

#[derive(Debug, Deserialize)]
struct FeedSource {
    url: String,
    #[serde(rename = "type")]
    kind: SourceKind,
    priority: u8,
    #[serde(default = "default_ttl")]
    cache_ttl: u64,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_popularity() -> f32 {
    DEFAULT_POPULARITY
}

fn default_ttl() -> u64 {
    DEFAULT_SOURCE_TTL_SECONDS
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum FeedEntryError {
    #[error("entry does not match the feed schema: {0}")]
    Schema(#[from] serde_json::Error),
    #[error(transparent)]
    Id(#[from] LibraryIdError),
    #[error("name is empty")]
    EmptyName,
    #[error("source priority {0} outside 1..=10")]
    Priority(u8),
    #[error("source url is empty")]
    EmptyUrl,
    #[error("popularity score {0} outside [0, 1]")]
    Popularity(f32),
}

/// Entries that parsed, plus how many were skipped.
#[derive(Debug, Default)]
pub struct ParsedFeed {
    pub records: Vec<LibraryRecord>,
    pub skipped: usize,
}

/// Parse a registry feed document.
///
/// Only a top-level failure is an error. Each entry is parsed on its own and a
/// bad one is skipped with a warning.
pub fn parse_feed(body: &str, fetched_at: DateTime<Utc>) -> Result<ParsedFeed, serde_json::Error> {
    let feed: Feed = serde_json::from_str(body)?;

    let mut parsed = ParsedFeed::default();
    for raw in feed.libraries {
        let label = raw
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        match parse_entry(raw, fetched_at) {
            Ok(record) => parsed.records.push(record),
            Err(e) => {
                warn!(library_id = %label, error = %e, "skipping registry entry");
                parsed.skipped += 1;
            }
        }
    }
    Ok(parsed)
}

fn parse_entry(
    raw: serde_json::Value,
    fetched_at: DateTime<Utc>,
) -> Result<LibraryRecord, FeedEntryError> {
    let entry: FeedEntry = serde_json::from_value(raw)?;

    let id = LibraryId::parse(&entry.id)?;
    if entry.name.trim().is_empty() {
        return Err(FeedEntryError::EmptyName);
    }
    if !(0.0..=1.0).contains(&entry.popularity_score) {
        return Err(FeedEntryError::Popularity(entry.popularity_score));
    }

    let sources = entry
        .documentation_sources
        .into_iter()
        .map(|source| {
            if !(1..=10).contains(&source.priority) {
                return Err(FeedEntryError::Priority(source.priority));
            }
            if source.url.trim().is_empty() {
                return Err(FeedEntryError::EmptyUrl);
            }
            Ok(SourceSpec {
                url: source.url.trim_end_matches('/').to_string(),
                kind: source.kind,
                priority: source.priority,
                ttl_seconds: source.cache_ttl,
                enabled: source.enabled,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LibraryRecord {
        id,
        name: entry.name.trim().to_string(),
        description: entry.description,
        sources,
        tags: entry.tags.into_iter().collect::<BTreeSet<_>>(),
        popularity_score: entry.popularity_score,
        last_updated: fetched_at,
        repository_url: entry.repository_url,
        package_manager: entry.package_manager,
        version: entry.version,
    })
}
