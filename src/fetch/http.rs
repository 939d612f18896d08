use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::FetchError;

/// Minimal GET-only transport used for registry feeds and documentation pages.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetch `url` and return the body as text.
    ///
    /// Non-success status codes are errors. Implementations must not wait
    /// longer than `timeout`.
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;
}

/// `reqwest`-backed client shared across all requests.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                reason: format!("client build failed: {e}"),
            })?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| transport_error(url, e))
    }
}

/// `client.get_text` bounded by `timeout` regardless of how the client
/// implements its own deadline.
pub async fn get_with_timeout(
    client: &dyn HttpClient,
    url: &str,
    timeout: Duration,
) -> Result<String, FetchError> {
    match tokio::time::timeout(timeout, client.get_text(url, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(url.to_string())),
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}
