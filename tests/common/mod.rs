#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use context_docs::error::FetchError;
use context_docs::fetch::HttpClient;
use context_docs::registry::{Registry, RegistryOptions};
use context_docs::types::{LibraryId, LibraryRecord, SourceKind, SourceSpec};

#[derive(Clone)]
enum Scripted {
    Body(String),
    Status(u16),
    Delayed(Duration, String),
}

/// An `HttpClient` that answers from a fixed script and records every URL
/// it was asked for. Unscripted URLs answer 404.
#[derive(Default)]
pub struct ScriptedHttp {
    script: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, url: &str, body: impl Into<String>) -> Self {
        self.script.lock().insert(url.to_string(), Scripted::Body(body.into()));
        self
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.script.lock().insert(url.to_string(), Scripted::Status(status));
        self
    }

    pub fn with_delay(self, url: &str, delay: Duration, body: impl Into<String>) -> Self {
        self.script
            .lock()
            .insert(url.to_string(), Scripted::Delayed(delay, body.into()));
        self
    }

    pub fn set_body(&self, url: &str, body: impl Into<String>) {
        self.script.lock().insert(url.to_string(), Scripted::Body(body.into()));
    }

    pub fn set_delayed(&self, url: &str, delay: Duration, body: impl Into<String>) {
        self.script
            .lock()
            .insert(url.to_string(), Scripted::Delayed(delay, body.into()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|u| u.as_str() == url).count()
    }

    pub fn was_called_with_prefix(&self, prefix: &str) -> bool {
        self.calls.lock().iter().any(|u| u.starts_with(prefix))
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn get_text(&self, url: &str, _timeout: Duration) -> Result<String, FetchError> {
        self.calls.lock().push(url.to_string());
        let scripted = self.script.lock().get(url).cloned();
        match scripted {
            Some(Scripted::Body(body)) => Ok(body),
            Some(Scripted::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
            Some(Scripted::Delayed(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(body)
            }
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// `n` distinct word tokens separated by spaces: `p0 p1 p2 ...`.
pub fn words(prefix: &str, n: usize) -> String {
    (0..n)
        .map(|i| format!("{prefix}{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn html_page(body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>t</title><script>var x = 1;</script></head>\
         <body><nav>Home | Docs</nav><main><p>{body}</p></main>\
         <footer>(c) footer</footer></body></html>"
    )
}

pub fn library(id: &str, name: &str, popularity: f32) -> LibraryRecord {
    LibraryRecord::new(LibraryId::parse(id).expect("valid test id"), name)
        .with_popularity(popularity)
}

pub fn community_source(url: &str, priority: u8) -> SourceSpec {
    SourceSpec::new(url, SourceKind::Community, priority)
}

pub fn offline_registry(records: Vec<LibraryRecord>, http: Arc<ScriptedHttp>) -> Arc<Registry> {
    Arc::new(Registry::with_seed(records, http, RegistryOptions::default()))
}
