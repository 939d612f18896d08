use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use tracing::debug;

use super::extract::ContentExtractor;
use super::http::{get_with_timeout, HttpClient};
use crate::aggregate::FRAGMENT_SEPARATOR;
use crate::error::FetchError;
use crate::types::{SourceKind, SourceSpec};

const GITHUB_BRANCHES: &[&str] = &["main", "master"];
const GITHUB_VIEWS: &[&str] = &["raw", "blob"];
const DOCS_TOPIC_PATTERNS: &[&str] = &[
    "{url}/{topic}",
    "{url}/docs/{topic}",
    "{url}/guide/{topic}",
    "{url}/api/{topic}",
    "{url}/{topic}.html",
];

/// Text obtained from one source and the URL it actually came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedText {
    pub url: String,
    pub text: String,
}

/// Everything a strategy needs to talk to the outside world.
pub struct FetchContext<'a> {
    pub http: &'a dyn HttpClient,
    pub extractor: &'a dyn ContentExtractor,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// When the whole source has to be done. Strategies that combine
    /// several files keep what they have once it passes.
    pub deadline: Instant,
}

/// Fetch one source using the strategy for its kind.
pub async fn fetch_source(
    ctx: &FetchContext<'_>,
    source: &SourceSpec,
    topic: Option<&str>,
) -> Result<FetchedText, FetchError> {
    let base = source.url.trim_end_matches('/');
    match source.kind {
        SourceKind::Github => fetch_github(ctx, base, topic).await,
        SourceKind::OfficialDocs | SourceKind::ApiReference => {
            fetch_docs_site(ctx, base, topic).await
        }
        SourceKind::PackageRegistryNpm
        | SourceKind::PackageRegistryPypi
        | SourceKind::Community => fetch_page(ctx, base).await.map(|text| FetchedText {
            url: base.to_string(),
            text,
        }),
    }
}

/// README plus, with a topic, `docs/<topic>.md`, each tried across branches.
async fn fetch_github(
    ctx: &FetchContext<'_>,
    base: &str,
    topic: Option<&str>,
) -> Result<FetchedText, FetchError> {
    let mut parts = Vec::new();

    match timeout_at(ctx.deadline, find_repository_file(ctx, base, "README.md")).await {
        Ok(Some(readme)) => parts.push(format!("# README\n\n{readme}")),
        Ok(None) => {}
        Err(_) => return Err(FetchError::Timeout(base.to_string())),
    }
    if let Some(topic) = topic {
        let path = format!("docs/{}.md", topic_slug(topic));
        match timeout_at(ctx.deadline, find_repository_file(ctx, base, &path)).await {
            Ok(Some(doc)) => parts.push(format!("# {}\n\n{doc}", title_case(topic))),
            Ok(None) => {}
            Err(_) => debug!(url = %base, path = %path, "out of time for topic doc"),
        }
    }

    if parts.is_empty() {
        return Err(FetchError::Empty(base.to_string()));
    }
    Ok(FetchedText {
        url: base.to_string(),
        text: parts.join(FRAGMENT_SEPARATOR),
    })
}

async fn find_repository_file(ctx: &FetchContext<'_>, base: &str, path: &str) -> Option<String> {
    for view in GITHUB_VIEWS {
        for branch in GITHUB_BRANCHES {
            let url = format!("{base}/{view}/{branch}/{path}");
            match get_with_timeout(ctx.http, &url, ctx.timeout).await {
                Ok(body) => {
                    let text = if looks_like_html(&body) {
                        match ctx.extractor.extract(&body) {
                            Ok(text) => text,
                            Err(e) => {
                                debug!(url = %url, error = %e, "repository page not extractable");
                                continue;
                            }
                        }
                    } else {
                        body
                    };
                    if !text.trim().is_empty() {
                        return Some(text.trim().to_string());
                    }
                }
                Err(e) => debug!(url = %url, error = %e, "repository file missed"),
            }
        }
    }
    None
}

/// Topic-specific pages first, then the site's base page.
async fn fetch_docs_site(
    ctx: &FetchContext<'_>,
    base: &str,
    topic: Option<&str>,
) -> Result<FetchedText, FetchError> {
    if let Some(topic) = topic {
        let slug = topic_slug(topic);
        for pattern in DOCS_TOPIC_PATTERNS {
            let url = pattern.replace("{url}", base).replace("{topic}", &slug);
            match fetch_page(ctx, &url).await {
                Ok(text) => return Ok(FetchedText { url, text }),
                Err(e) => debug!(url = %url, error = %e, "topic page missed"),
            }
        }
    }

    let text = fetch_page(ctx, base).await?;
    Ok(FetchedText {
        url: base.to_string(),
        text,
    })
}

/// GET an HTML page and hand it to the extractor.
async fn fetch_page(ctx: &FetchContext<'_>, url: &str) -> Result<String, FetchError> {
    let html = get_with_timeout(ctx.http, url, ctx.timeout).await?;
    let text = ctx.extractor.extract(&html)?;
    if text.trim().is_empty() {
        return Err(FetchError::Empty(url.to_string()));
    }
    Ok(text)
}

fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(256).collect::<String>().to_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html") || head.contains("<head")
}

/// `"App Router"` -> `"app-router"`
pub fn topic_slug(topic: &str) -> String {
    topic
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn title_case(topic: &str) -> String {
    topic
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
