use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_REGISTRY_URL: &str =
    "https://raw.githubusercontent.com/context7/registry/main/libraries.json";

const ENV_PREFIX: &str = "CONTEXT_DOCS_";

// Key point:
// Serializable
// Explicit defaults
// Environment only overlays, never required
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub cache_ttl_seconds: u64,
    pub cache_max_entries: usize,
    /// When set, cache entries persist under this directory.
    pub cache_dir: Option<PathBuf>,
    pub default_token_limit: usize,
    pub max_token_limit: usize,
    /// Remote registry feed. `None` disables refresh entirely.
    pub registry_url: Option<String>,
    pub registry_refresh_seconds: u64,
    pub http_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 3600,
            cache_max_entries: 1000,
            cache_dir: None,
            default_token_limit: 10_000,
            max_token_limit: 50_000,
            registry_url: Some(DEFAULT_REGISTRY_URL.to_string()),
            registry_refresh_seconds: 24 * 60 * 60,
            http_timeout_seconds: 30,
            request_timeout_seconds: 120,
            user_agent: concat!("context-docs/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Settings {
    /// Defaults overlaid with `CONTEXT_DOCS_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Settings::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        overlay(&var, "CACHE_TTL_SECONDS", &mut settings.cache_ttl_seconds);
        overlay(&var, "CACHE_MAX_ENTRIES", &mut settings.cache_max_entries);
        overlay(&var, "DEFAULT_TOKEN_LIMIT", &mut settings.default_token_limit);
        overlay(&var, "MAX_TOKEN_LIMIT", &mut settings.max_token_limit);
        overlay(&var, "REGISTRY_REFRESH_SECONDS", &mut settings.registry_refresh_seconds);
        overlay(&var, "HTTP_TIMEOUT_SECONDS", &mut settings.http_timeout_seconds);
        overlay(&var, "REQUEST_TIMEOUT_SECONDS", &mut settings.request_timeout_seconds);

        if let Some(dir) = var("CACHE_DIR").filter(|d| !d.trim().is_empty()) {
            settings.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = var("REGISTRY_URL") {
            let url = url.trim().to_string();
            settings.registry_url = if url.is_empty() { None } else { Some(url) };
        }
        if let Some(agent) = var("USER_AGENT").filter(|a| !a.trim().is_empty()) {
            settings.user_agent = agent;
        }

        settings
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn registry_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.registry_refresh_seconds)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn overlay<T, F>(var: &F, name: &str, slot: &mut T)
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = var(name) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => warn!(
            variable = %format!("{ENV_PREFIX}{name}"),
            value = %raw,
            "ignoring unparseable setting"
        ),
    }
}
