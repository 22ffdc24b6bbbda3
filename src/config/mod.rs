//! Configuration management.
//!
//! All tunables live in one serde-defaulted [`Config`] passed into each
//! component's constructor; there is no process-wide mutable state. Values
//! layer as: built-in defaults < config file < `SCHOLAR_HARVEST_*` env vars.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding the configured proxy URL
pub const PROXY_ENV_VAR: &str = "SCHOLAR_HARVEST_PROXY";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Outbound proxy settings
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Search harvester settings
    #[serde(default)]
    pub harvest: HarvestConfig,

    /// Homepage acceptance heuristics
    #[serde(default)]
    pub homepage: HomepageConfig,

    /// Email validity and spam filtering
    #[serde(default)]
    pub email_filter: EmailFilterConfig,

    /// Bot-challenge escalation settings
    #[serde(default)]
    pub challenge: ChallengeConfig,
}

/// Proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Whether to route requests through the proxy at all
    #[serde(default)]
    pub enabled: bool,

    /// Proxy URL used when enabled and no env override is present
    #[serde(default = "default_proxy_url")]
    pub url: String,

    /// URL probed once at session start to verify the proxy is alive
    #[serde(default = "default_probe_url")]
    pub probe_url: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_proxy_url(),
            probe_url: default_probe_url(),
        }
    }
}

impl ProxyConfig {
    /// Resolve the effective proxy URL: env override, else configured URL.
    /// Returns `None` when proxying is disabled (direct connection).
    pub fn resolve(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }
        match std::env::var(PROXY_ENV_VAR) {
            Ok(url) if !url.trim().is_empty() => Some(url),
            _ => Some(self.url.clone()),
        }
    }
}

fn default_proxy_url() -> String {
    "http://127.0.0.1:7890".to_string()
}

fn default_probe_url() -> String {
    "https://www.google.com".to_string()
}

/// Search harvester configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Search engine base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Result blocks per page; also the `start=` increment
    #[serde(default = "default_results_per_page")]
    pub results_per_page: usize,

    /// Hard cap on pages fetched per query
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Fixed delay between page fetches, in seconds
    #[serde(default = "default_request_delay")]
    pub request_delay_secs: u64,

    /// Backoff before the single HTTP 429 retry, in seconds
    #[serde(default = "default_rate_limit_backoff")]
    pub rate_limit_backoff_secs: u64,

    /// Per-request timeout, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Body phrases that identify a bot-challenge interstitial
    #[serde(default = "default_challenge_phrases")]
    pub challenge_phrases: Vec<String>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            results_per_page: default_results_per_page(),
            max_pages: default_max_pages(),
            request_delay_secs: default_request_delay(),
            rate_limit_backoff_secs: default_rate_limit_backoff(),
            timeout_secs: default_timeout(),
            challenge_phrases: default_challenge_phrases(),
        }
    }
}

fn default_base_url() -> String {
    "https://scholar.google.com".to_string()
}

fn default_results_per_page() -> usize {
    10
}

fn default_max_pages() -> usize {
    50
}

fn default_request_delay() -> u64 {
    5
}

fn default_rate_limit_backoff() -> u64 {
    30
}

fn default_timeout() -> u64 {
    30
}

fn default_challenge_phrases() -> Vec<String> {
    vec![
        "unusual traffic from your computer network".to_string(),
        "not a robot".to_string(),
    ]
}

/// Homepage acceptance heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomepageConfig {
    /// A candidate link is accepted only when its URL (sans trailing slash)
    /// ends with this suffix
    #[serde(default = "default_homepage_suffix")]
    pub accepted_suffix: String,

    /// Substrings that disqualify a candidate outright
    #[serde(default = "default_excluded_patterns")]
    pub excluded_patterns: Vec<String>,
}

impl Default for HomepageConfig {
    fn default() -> Self {
        Self {
            accepted_suffix: default_homepage_suffix(),
            excluded_patterns: default_excluded_patterns(),
        }
    }
}

fn default_homepage_suffix() -> String {
    "github.io".to_string()
}

fn default_excluded_patterns() -> Vec<String> {
    [
        "scholar.google.com",
        "google.com",
        "gmail.com",
        "googleusercontent.com",
        "gstatic.com",
        "javascript:",
        "mailto:",
        "#",
        "facebook.com",
        "twitter.com",
        "linkedin.com",
        "researchgate.net",
        "orcid.org",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Email validity and spam filtering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailFilterConfig {
    /// Disposable/placeholder domains matched as substrings
    #[serde(default = "default_spam_domains")]
    pub spam_domains: Vec<String>,

    /// System mailbox prefixes matched exactly against the local part
    #[serde(default = "default_spam_prefixes")]
    pub spam_prefixes: Vec<String>,

    /// Test-ish patterns matched as substrings of the local part
    #[serde(default = "default_test_patterns")]
    pub test_patterns: Vec<String>,
}

impl Default for EmailFilterConfig {
    fn default() -> Self {
        Self {
            spam_domains: default_spam_domains(),
            spam_prefixes: default_spam_prefixes(),
            test_patterns: default_test_patterns(),
        }
    }
}

fn default_spam_domains() -> Vec<String> {
    [
        "example.com",
        "test.com",
        "dummy.com",
        "localhost",
        "tempmail.com",
        "10minutemail.com",
        "guerrillamail.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_spam_prefixes() -> Vec<String> {
    [
        "noreply",
        "no-reply",
        "donotreply",
        "do-not-reply",
        "admin",
        "webmaster",
        "info",
        "support",
        "contact",
        "hello",
        "help",
        "service",
        "sales",
        "marketing",
        "postmaster",
        "mailer-daemon",
        "root",
        "daemon",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_test_patterns() -> Vec<String> {
    ["test", "demo", "sample", "fake", "invalid"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// How to react when a fetched page turns out to be a bot challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeMode {
    /// No handler: the blocked page counts as a page failure
    Unavailable,
    /// Open a visible browser and wait for a manual solve
    InteractiveBrowser,
}

/// Bot-challenge escalation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeConfig {
    /// Escalation strategy
    #[serde(default = "default_challenge_mode")]
    pub mode: ChallengeMode,

    /// Grace window for a manual solve, in seconds
    #[serde(default = "default_grace")]
    pub grace_secs: u64,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            mode: default_challenge_mode(),
            grace_secs: default_grace(),
        }
    }
}

fn default_challenge_mode() -> ChallengeMode {
    ChallengeMode::Unavailable
}

fn default_grace() -> u64 {
    30
}

/// Load configuration from a file, layered with environment variables
pub fn load_config(path: &PathBuf) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path.as_path()))
        .add_source(config::Environment::with_prefix("SCHOLAR_HARVEST"))
        .build()?;

    settings.try_deserialize()
}

/// Get the default configuration (from env vars or defaults)
pub fn get_config() -> Config {
    Config::default()
}
