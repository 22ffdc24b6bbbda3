//! Paginated Google Scholar search with anti-bot escalation.
//!
//! The harvester walks result pages ten records at a time, paces its
//! requests, dedupes titles, and applies the caller's title filter. A
//! failure on the first page is fatal and classified for the user; a
//! failure deeper in is logged and the walk moves on to the next page.

pub mod challenge;
pub mod parse;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Datelike;
use thiserror::Error;

use crate::config::{Config, HarvestConfig};
use crate::fetch::{FetchError, PageFetcher};
use crate::models::{normalize_title, Record, SearchQuery};
use challenge::{ChallengeError, ChallengeHandler};
use parse::parse_page;

/// Classified harvest failure, suitable for direct display.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("proxy unavailable: {0}")]
    ProxyUnavailable(String),

    #[error("blocked by bot detection")]
    Blocked,

    #[error("rate limited by upstream")]
    RateLimited,

    #[error("network failure: {0}")]
    Network(String),

    #[error(transparent)]
    Challenge(#[from] ChallengeError),
}

impl HarvestError {
    /// Actionable one-liner for the operator.
    pub fn user_message(&self) -> String {
        match self {
            HarvestError::ProxyUnavailable(detail) => format!(
                "The configured proxy is unreachable ({detail}). \
                 Check the proxy URL or disable the proxy."
            ),
            HarvestError::Blocked | HarvestError::Challenge(ChallengeError::Unavailable) => {
                "Google Scholar's bot detection blocked the request. \
                 Wait a while, switch proxies, or enable the interactive \
                 browser challenge handler."
                    .to_string()
            }
            HarvestError::Challenge(ChallengeError::Browser(detail)) => {
                format!("The browser challenge attempt failed ({detail}).")
            }
            HarvestError::RateLimited => {
                "Google Scholar is rate limiting requests. Wait a few minutes before retrying."
                    .to_string()
            }
            HarvestError::Network(detail) => {
                format!("Network failure while reaching Google Scholar: {detail}.")
            }
        }
    }
}

impl From<FetchError> for HarvestError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::ProxyUnavailable(detail) => HarvestError::ProxyUnavailable(detail),
            FetchError::RateLimited => HarvestError::RateLimited,
            FetchError::Forbidden | FetchError::Blocked => HarvestError::Blocked,
            FetchError::Http(status) => HarvestError::Network(format!("HTTP {status}")),
            FetchError::Timeout => HarvestError::Network("request timed out".to_string()),
            FetchError::Network(detail) => HarvestError::Network(detail),
        }
    }
}

/// Paginated search session against one Scholar endpoint.
pub struct Harvester {
    fetcher: PageFetcher,
    config: HarvestConfig,
    handler: Arc<dyn ChallengeHandler>,
    current_year: u16,
}

impl Harvester {
    /// Open a session: pick an identity, verify the proxy, wire up the
    /// configured challenge handler.
    pub async fn connect(config: &Config) -> Result<Self, HarvestError> {
        let fetcher = PageFetcher::connect(config).await?;
        Ok(Self {
            fetcher,
            config: config.harvest.clone(),
            handler: challenge::handler_for(&config.challenge, &config.harvest.challenge_phrases),
            current_year: chrono::Utc::now().year() as u16,
        })
    }

    /// Replace the challenge handler (tests inject a scripted one here)
    pub fn with_challenge_handler(mut self, handler: Arc<dyn ChallengeHandler>) -> Self {
        self.handler = handler;
        self
    }

    /// Result-page URL for a pagination offset.
    ///
    /// The upper year bound is dropped when it equals the current year,
    /// where it would only narrow the result set for no reason.
    pub fn build_url(&self, query: &SearchQuery, start: usize) -> String {
        let keyword = urlencoding::encode(query.keyword.trim()).replace("%20", "+");
        let mut url = format!(
            "{}/scholar?q={}&hl=en&as_sdt=0,5&start={}",
            self.config.base_url.trim_end_matches('/'),
            keyword,
            start,
        );
        if let Some(ylo) = query.start_year {
            url.push_str(&format!("&as_ylo={ylo}"));
        }
        if let Some(yhi) = query.end_year {
            if yhi != self.current_year {
                url.push_str(&format!("&as_yhi={yhi}"));
            }
        }
        url
    }

    /// Run the full paginated search.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<Record>, HarvestError> {
        let terms = query.keyword_terms();
        let known: HashSet<String> = query
            .known_titles
            .iter()
            .map(|t| normalize_title(t))
            .collect();
        let mut collected: Vec<Record> = Vec::new();

        tracing::info!(
            keyword = %query.keyword,
            wanted = query.num_results,
            "starting harvest"
        );

        'pages: for page in 0..self.config.max_pages {
            if page > 0 {
                tokio::time::sleep(Duration::from_secs(self.config.request_delay_secs)).await;
            }

            let start = page * self.config.results_per_page;
            let url = self.build_url(query, start);

            let html = match self.fetch_page(&url).await {
                Ok(html) => html,
                Err(err) if page == 0 => {
                    tracing::error!(error = %err, "first result page failed, aborting");
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(page, error = %err, "result page failed, moving on");
                    continue;
                }
            };

            let parsed = parse_page(&html, &self.config.base_url, self.current_year);
            if parsed.block_count == 0 {
                tracing::info!(page, "no result blocks, result set exhausted");
                break;
            }

            for record in parsed.records {
                if collected.len() >= query.num_results {
                    break 'pages;
                }
                if query.exclude_duplicates && known.contains(&normalize_title(&record.title)) {
                    tracing::debug!(title = %record.title, "dropped as already known");
                    continue;
                }
                if query.filter_by_title && !title_matches(&record.title, &terms) {
                    tracing::debug!(title = %record.title, "dropped by title filter");
                    continue;
                }
                collected.push(record);
            }

            if collected.len() >= query.num_results {
                break;
            }
        }

        tracing::info!(count = collected.len(), "harvest finished");
        Ok(collected)
    }

    /// Fetch one result page, escalating a challenge to the handler.
    async fn fetch_page(&self, url: &str) -> Result<String, HarvestError> {
        match self.fetcher.fetch(url).await {
            Ok((_, html)) => Ok(html),
            Err(FetchError::Blocked) => {
                tracing::warn!(%url, "challenge page served, escalating to handler");
                let handler = Arc::clone(&self.handler);
                let challenge_url = url.to_string();
                let html = tokio::task::spawn_blocking(move || handler.resolve(&challenge_url))
                    .await
                    .map_err(|e| HarvestError::Network(e.to_string()))??;

                if self.fetcher.is_challenge(&html) {
                    return Err(HarvestError::Blocked);
                }
                Ok(html)
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn title_matches(title: &str, terms: &[String]) -> bool {
    if terms.is_empty() {
        return true;
    }
    let lower = title.to_lowercase();
    terms.iter().any(|t| lower.contains(t.as_str()))
}
