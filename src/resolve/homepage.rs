//! Personal homepage discovery on author profile pages.
//!
//! Profiles expose a verified homepage link in several inconsistent
//! places, so five strategies run over the same page and their hits are
//! unioned before the acceptance predicate picks a winner. Only sites
//! whose host ends with the accepted suffix (GitHub Pages by default)
//! are treated as personal homepages.

use regex::Regex;
use scraper::{Html, Selector};

use crate::config::HomepageConfig;

pub struct HomepageDiscovery {
    config: HomepageConfig,
    url_pattern: Regex,
}

impl HomepageDiscovery {
    pub fn new(config: HomepageConfig) -> Result<Self, regex::Error> {
        let suffix = regex::escape(&config.accepted_suffix);
        let url_pattern = Regex::new(&format!(
            r#"https?://[a-zA-Z0-9\-_.]+\.{suffix}/?[^"\s<>]*"#
        ))?;
        Ok(Self { config, url_pattern })
    }

    /// Find the author's personal homepage on their profile page.
    ///
    /// Strategies run in discovery order over the same page; the first
    /// acceptable hit wins.
    pub fn discover(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);

        // strategy 1: URL anywhere in the raw page source
        let mut strategies: Vec<Vec<String>> = Vec::new();
        strategies.push(self.source_urls(html));

        // strategy 2: anchors inside the profile info sections
        strategies.push(self.anchor_urls(
            &document,
            "div#gsc_prf_i a, div#gsc_prf_ivh a, .gsc_prf_il a",
        ));

        // strategy 3: every anchor on the page
        strategies.push(self.anchor_urls(&document, "a[href]"));

        // strategy 4: attribute selector scoped to the suffix
        let scoped = format!("a[href*=\"{}\"]", self.config.accepted_suffix);
        strategies.push(self.anchor_urls(&document, &scoped));

        // strategy 5: URL spelled out in the visible text
        let text = document.root_element().text().collect::<String>();
        strategies.push(self.source_urls(&text));

        let mut seen = std::collections::HashSet::new();
        for candidates in strategies {
            for url in candidates {
                if seen.insert(url.clone()) && self.is_personal_site(&url) {
                    tracing::debug!(%url, "personal homepage discovered");
                    return Some(url);
                }
            }
        }
        None
    }

    fn source_urls(&self, content: &str) -> Vec<String> {
        self.url_pattern
            .find_iter(content)
            .map(|m| m.as_str().trim_end_matches(['"', ',', ';']).to_string())
            .collect()
    }

    fn anchor_urls(&self, document: &Html, selector: &str) -> Vec<String> {
        let suffix_lower = self.config.accepted_suffix.to_lowercase();
        let sel = match Selector::parse(selector) {
            Ok(sel) => sel,
            Err(_) => return Vec::new(),
        };
        document
            .select(&sel)
            .filter_map(|anchor| anchor.value().attr("href"))
            .filter(|href| href.to_lowercase().contains(&suffix_lower))
            .map(str::to_string)
            .collect()
    }

    /// Acceptance predicate: an external http(s) site whose host ends
    /// with the accepted suffix and matches no exclusion pattern.
    pub fn is_personal_site(&self, url: &str) -> bool {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return false;
        }
        let lower = url.to_lowercase();
        if self
            .config
            .excluded_patterns
            .iter()
            .any(|p| lower.contains(p.as_str()))
        {
            return false;
        }
        lower
            .trim_end_matches('/')
            .ends_with(&self.config.accepted_suffix.to_lowercase())
    }
}
