use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifiers::LibraryId;

pub const DEFAULT_SOURCE_TTL_SECONDS: u64 = 3600;

/// Where a documentation source lives, which decides how it is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Github,
    OfficialDocs,
    ApiReference,
    #[serde(alias = "npm_registry")]
    PackageRegistryNpm,
    #[serde(alias = "pypi_registry")]
    PackageRegistryPypi,
    Community,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Github => "github",
            SourceKind::OfficialDocs => "official_docs",
            SourceKind::ApiReference => "api_reference",
            SourceKind::PackageRegistryNpm => "package_registry_npm",
            SourceKind::PackageRegistryPypi => "package_registry_pypi",
            SourceKind::Community => "community",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub url: String,
    pub kind: SourceKind,
    /// 1 is fetched first, 10 last.
    pub priority: u8,
    pub ttl_seconds: u64,
    pub enabled: bool,
}

impl SourceSpec {
    pub fn new(url: impl Into<String>, kind: SourceKind, priority: u8) -> Self {
        Self {
            url: url.into(),
            kind,
            priority,
            ttl_seconds: DEFAULT_SOURCE_TTL_SECONDS,
            enabled: true,
        }
    }
}

/// A library entry as published in a registry snapshot.
///
/// Records are never mutated once published; a refresh replaces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryRecord {
    pub id: LibraryId,
    pub name: String,
    pub description: String,
    pub sources: Vec<SourceSpec>,
    pub tags: BTreeSet<String>,
    pub popularity_score: f32,
    pub last_updated: DateTime<Utc>,
    pub repository_url: Option<String>,
    pub package_manager: Option<String>,
    pub version: Option<String>,
}

impl LibraryRecord {
    pub fn new(id: LibraryId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            sources: Vec::new(),
            tags: BTreeSet::new(),
            popularity_score: 0.0,
            last_updated: Utc::now(),
            repository_url: None,
            package_manager: None,
            version: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_source(mut self, source: SourceSpec) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_popularity(mut self, score: f32) -> Self {
        self.popularity_score = score.clamp(0.0, 1.0);
        self
    }

    pub fn with_repository(
        mut self,
        url: impl Into<String>,
        package_manager: impl Into<String>,
    ) -> Self {
        self.repository_url = Some(url.into());
        self.package_manager = Some(package_manager.into());
        self
    }
}
