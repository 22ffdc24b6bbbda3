//! Proxy-aware HTTP fetching with identity rotation and error classification.
//!
//! A [`PageFetcher`] owns one `reqwest` client for the lifetime of a
//! search/resolution session. Construction picks the session's User-Agent
//! from a fixed pool and, when a proxy is configured, performs a single
//! liveness probe before any other call is allowed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;

/// Fixed User-Agent pool; one entry is selected per session.
pub const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

static UA_ROTATION: AtomicUsize = AtomicUsize::new(0);

/// Errors that can occur when fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    /// The configured proxy failed its liveness probe; the session cannot start
    #[error("proxy unavailable: {0}")]
    ProxyUnavailable(String),

    /// HTTP 429 persisted through the single backoff retry
    #[error("rate limited by upstream (HTTP 429)")]
    RateLimited,

    /// HTTP 403; non-retryable
    #[error("access forbidden (HTTP 403)")]
    Forbidden,

    /// The response body contains a known bot-challenge phrase; the caller
    /// should escalate rather than treat this as a hard failure
    #[error("bot challenge detected")]
    Blocked,

    /// Any other non-200 status
    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode),

    /// Request exceeded its deadline
    #[error("request timed out")]
    Timeout,

    /// Connection or protocol failure
    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Proxy-aware HTTP client with a session-stable identity.
#[derive(Debug)]
pub struct PageFetcher {
    client: reqwest::Client,
    user_agent: &'static str,
    challenge_phrases: Vec<String>,
    rate_limit_backoff: Duration,
}

impl PageFetcher {
    /// Build a fetcher for one session.
    ///
    /// Rotates to the next User-Agent in the pool and, if the proxy is
    /// enabled, probes it once; probe failure is fatal for the session.
    pub async fn connect(config: &Config) -> Result<Self, FetchError> {
        let user_agent =
            USER_AGENTS[UA_ROTATION.fetch_add(1, Ordering::Relaxed) % USER_AGENTS.len()];

        let proxy_url = config.proxy.resolve();

        let mut builder = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(config.harvest.timeout_secs))
            .connect_timeout(Duration::from_secs(10));

        if let Some(url) = &proxy_url {
            url::Url::parse(url)
                .map_err(|e| FetchError::ProxyUnavailable(format!("bad proxy url: {e}")))?;
            tracing::info!(proxy = %url, "routing requests through proxy");
            let proxy = reqwest::Proxy::all(url)
                .map_err(|e| FetchError::ProxyUnavailable(e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(FetchError::from)?;

        let fetcher = Self {
            client,
            user_agent,
            challenge_phrases: config.harvest.challenge_phrases.clone(),
            rate_limit_backoff: Duration::from_secs(config.harvest.rate_limit_backoff_secs),
        };

        if proxy_url.is_some() {
            fetcher.probe(&config.proxy.probe_url).await?;
        }

        tracing::debug!(user_agent = fetcher.user_agent, "session identity selected");
        Ok(fetcher)
    }

    /// The User-Agent selected for this session
    pub fn user_agent(&self) -> &'static str {
        self.user_agent
    }

    /// One-shot proxy liveness check
    async fn probe(&self, probe_url: &str) -> Result<(), FetchError> {
        let response = self
            .client
            .get(probe_url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| FetchError::ProxyUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::ProxyUnavailable(format!(
                "probe returned status {}",
                response.status()
            )));
        }

        tracing::debug!("proxy liveness probe succeeded");
        Ok(())
    }

    /// Fetch a page as text with full failure classification.
    ///
    /// HTTP 429 is retried once after a fixed backoff; 403 fails
    /// immediately; a body containing a bot-challenge phrase yields
    /// [`FetchError::Blocked`] so the caller can escalate.
    pub async fn fetch(&self, url: &str) -> Result<(reqwest::StatusCode, String), FetchError> {
        let mut response = self.client.get(url).send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(
                backoff_secs = self.rate_limit_backoff.as_secs(),
                "rate limited, retrying once after backoff"
            );
            tokio::time::sleep(self.rate_limit_backoff).await;

            response = self.client.get(url).send().await?;
            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(FetchError::RateLimited);
            }
        }

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(FetchError::Forbidden);
        }
        if !status.is_success() {
            return Err(FetchError::Http(status));
        }

        let body = response.text().await?;

        if self.is_challenge(&body) {
            tracing::warn!(%url, "bot challenge page detected");
            return Err(FetchError::Blocked);
        }

        Ok((status, body))
    }

    /// Download a binary document (no challenge detection)
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status));
        }

        let bytes = response.bytes().await?;
        tracing::debug!(%url, size = bytes.len(), "document downloaded");
        Ok(bytes.to_vec())
    }

    /// Whether the content matches a known bot-challenge phrase
    pub fn is_challenge(&self, content: &str) -> bool {
        self.challenge_phrases.iter().any(|p| content.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_backoff_config(server_url: &str) -> Config {
        let mut config = Config::default();
        config.harvest.rate_limit_backoff_secs = 0;
        config.harvest.base_url = server_url.to_string();
        config
    }

    #[tokio::test]
    async fn test_fetch_ok() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .with_status(200)
            .with_body("<html>hello</html>")
            .create_async()
            .await;

        let fetcher = PageFetcher::connect(&zero_backoff_config(&server.url()))
            .await
            .unwrap();
        let (status, body) = fetcher.fetch(&format!("{}/page", server.url())).await.unwrap();

        assert_eq!(status, reqwest::StatusCode::OK);
        assert_eq!(body, "<html>hello</html>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_forbidden_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .with_status(403)
            .expect(1)
            .create_async()
            .await;

        let fetcher = PageFetcher::connect(&zero_backoff_config(&server.url()))
            .await
            .unwrap();
        let err = fetcher
            .fetch(&format!("{}/page", server.url()))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Forbidden));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_retried_once_then_fails() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .with_status(429)
            .expect(2)
            .create_async()
            .await;

        let fetcher = PageFetcher::connect(&zero_backoff_config(&server.url()))
            .await
            .unwrap();
        let err = fetcher
            .fetch(&format!("{}/page", server.url()))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::RateLimited));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_challenge_body_yields_blocked() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/page")
            .with_status(200)
            .with_body("please verify you are not a robot")
            .create_async()
            .await;

        let fetcher = PageFetcher::connect(&zero_backoff_config(&server.url()))
            .await
            .unwrap();
        let err = fetcher
            .fetch(&format!("{}/page", server.url()))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Blocked));
    }

    #[tokio::test]
    async fn test_user_agent_from_pool() {
        let fetcher = PageFetcher::connect(&Config::default()).await.unwrap();
        assert!(USER_AGENTS.contains(&fetcher.user_agent()));
    }
}
