pub mod similarity;

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::registry::{Registry, RegistrySnapshot};
use crate::types::{LibraryRecord, ResolutionResult};
pub use similarity::ratio;

/// Minimum similarity (0..=100) for a record to become a candidate.
pub const MATCH_THRESHOLD: u8 = 60;
pub const MAX_CANDIDATES: usize = 10;

pub struct Resolver {
    registry: Arc<Registry>,
}

impl Resolver {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Resolve `query` against a fresh registry snapshot.
    pub async fn resolve(&self, query: &str) -> ResolutionResult {
        self.registry.ensure_fresh().await;
        let snapshot = self.registry.snapshot();
        resolve_in(&snapshot, query)
    }
}

/// Resolve `query` against one snapshot. Pure and deterministic.
pub fn resolve_in(snapshot: &RegistrySnapshot, query: &str) -> ResolutionResult {
    let normalized = query.trim().to_lowercase();
    debug!(query = %normalized, "resolving library");

    let exact_match = find_exact(snapshot, &normalized).map(|record| LibraryRecord::clone(record));

    // Fuzzy pass over every name and id; always runs. Snapshot ids are
    // unique, so each record is considered once with its better score.
    let mut max_score: u8 = 0;
    let mut candidates: Vec<&Arc<LibraryRecord>> = snapshot
        .iter()
        .filter(|record| {
            let name_score = ratio(&normalized, &record.name.to_lowercase());
            let id_score = ratio(&normalized, &record.id.as_str().to_lowercase());
            let best = name_score.max(id_score);
            max_score = max_score.max(best);
            best >= MATCH_THRESHOLD
        })
        .collect();

    // Popularity desc; ties stay in registry order.
    candidates.sort_by(|a, b| {
        b.popularity_score
            .partial_cmp(&a.popularity_score)
            .unwrap_or(Ordering::Equal)
    });
    candidates.truncate(MAX_CANDIDATES);

    let confidence = if exact_match.is_some() {
        1.0
    } else if candidates.is_empty() {
        0.0
    } else {
        f32::from(max_score) / 100.0
    };

    ResolutionResult {
        query: query.to_string(),
        exact_match,
        candidates: candidates
            .into_iter()
            .map(|record| LibraryRecord::clone(record))
            .collect(),
        confidence,
    }
}

/// Direct key hit first, then the first record (in registry order) whose
/// name or id equals the query, or whose id ends in `/query`.
fn find_exact<'a>(
    snapshot: &'a RegistrySnapshot,
    normalized: &str,
) -> Option<&'a Arc<LibraryRecord>> {
    if normalized.is_empty() {
        return None;
    }
    if let Some(record) = snapshot.get(normalized).or_else(|| snapshot.get_by_name(normalized)) {
        return Some(record);
    }

    let suffix = format!("/{normalized}");
    snapshot.iter().find(|record| {
        let name = record.name.to_lowercase();
        let id = record.id.as_str().to_lowercase();
        name == normalized || id == normalized || id.ends_with(&suffix)
    })
}
