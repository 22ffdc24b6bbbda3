//! Bot-challenge escalation.
//!
//! When a result page comes back as a challenge, the harvester hands the
//! URL to a [`ChallengeHandler`]. Handlers are blocking and run under
//! `spawn_blocking`; the interactive one opens a visible browser window
//! and gives the operator time to solve the puzzle by hand.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::{ChallengeConfig, ChallengeMode};

#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("no interactive challenge handler is configured")]
    Unavailable,

    #[error("browser challenge failed: {0}")]
    Browser(String),
}

/// Strategy for getting past a bot-challenge page.
///
/// `resolve` blocks; callers on the async runtime must dispatch it via
/// `tokio::task::spawn_blocking`.
pub trait ChallengeHandler: Send + Sync {
    /// Attempt to clear the challenge at `url` and return the page HTML
    /// as it reads afterwards.
    fn resolve(&self, url: &str) -> Result<String, ChallengeError>;
}

/// Refuses every challenge; the harvester fails fast.
pub struct NoChallengeHandler;

impl ChallengeHandler for NoChallengeHandler {
    fn resolve(&self, _url: &str) -> Result<String, ChallengeError> {
        Err(ChallengeError::Unavailable)
    }
}

/// Opens a headful Chrome window on the challenge URL. If the page
/// already reads clean it is returned as is; otherwise the operator gets
/// a grace period to solve the puzzle and the URL is loaded again.
pub struct InteractiveBrowser {
    grace: Duration,
    challenge_phrases: Vec<String>,
}

impl InteractiveBrowser {
    pub fn new(grace_secs: u64, challenge_phrases: Vec<String>) -> Self {
        Self {
            grace: Duration::from_secs(grace_secs),
            challenge_phrases,
        }
    }

    fn is_challenge(&self, content: &str) -> bool {
        self.challenge_phrases.iter().any(|p| content.contains(p))
    }
}

impl ChallengeHandler for InteractiveBrowser {
    fn resolve(&self, url: &str) -> Result<String, ChallengeError> {
        tracing::info!(%url, "opening browser for manual challenge");

        let options = headless_chrome::LaunchOptions::default_builder()
            .headless(false)
            .build()
            .map_err(|e| ChallengeError::Browser(e.to_string()))?;
        let browser = headless_chrome::Browser::new(options)
            .map_err(|e| ChallengeError::Browser(e.to_string()))?;

        let tab = browser
            .new_tab()
            .map_err(|e| ChallengeError::Browser(e.to_string()))?;
        tab.navigate_to(url)
            .map_err(|e| ChallengeError::Browser(e.to_string()))?;
        tab.wait_until_navigated()
            .map_err(|e| ChallengeError::Browser(e.to_string()))?;

        let html = tab
            .get_content()
            .map_err(|e| ChallengeError::Browser(e.to_string()))?;
        if !self.is_challenge(&html) {
            tracing::info!("browser session cleared the challenge on load");
            return Ok(html);
        }

        tracing::info!(
            grace_secs = self.grace.as_secs(),
            "waiting for the operator to solve the challenge"
        );
        std::thread::sleep(self.grace);

        tab.navigate_to(url)
            .map_err(|e| ChallengeError::Browser(e.to_string()))?;
        tab.wait_until_navigated()
            .map_err(|e| ChallengeError::Browser(e.to_string()))?;
        let html = tab
            .get_content()
            .map_err(|e| ChallengeError::Browser(e.to_string()))?;

        tracing::info!(chars = html.len(), "challenge page reloaded after grace period");
        Ok(html)
    }
}

/// Handler selected by configuration.
pub fn handler_for(
    config: &ChallengeConfig,
    challenge_phrases: &[String],
) -> Arc<dyn ChallengeHandler> {
    match config.mode {
        ChallengeMode::Unavailable => Arc::new(NoChallengeHandler),
        ChallengeMode::InteractiveBrowser => Arc::new(InteractiveBrowser::new(
            config.grace_secs,
            challenge_phrases.to_vec(),
        )),
    }
}
