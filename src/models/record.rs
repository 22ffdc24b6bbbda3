//! Search query and bibliographic record models.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Search query parameters.
///
/// Immutable per invocation; the known-title set is owned by the query so a
/// run never shares mutable state with another run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Keyword(s), comma-separated when used for title filtering
    pub keyword: String,

    /// Desired number of accepted records
    pub num_results: usize,

    /// Lower publication-year bound (inclusive)
    pub start_year: Option<u16>,

    /// Upper publication-year bound (inclusive)
    pub end_year: Option<u16>,

    /// Only accept records whose title contains one of the keyword terms
    pub filter_by_title: bool,

    /// Skip records whose title is already in `known_titles`
    pub exclude_duplicates: bool,

    /// Titles already known to the caller, used for deduplication
    pub known_titles: HashSet<String>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            keyword: String::new(),
            num_results: 10,
            start_year: None,
            end_year: None,
            filter_by_title: false,
            exclude_duplicates: false,
            known_titles: HashSet::new(),
        }
    }
}

impl SearchQuery {
    /// Create a new query for the given keyword
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            ..Default::default()
        }
    }

    /// Set the desired result count
    pub fn num_results(mut self, num: usize) -> Self {
        self.num_results = num;
        self
    }

    /// Set the publication-year bounds
    pub fn years(mut self, start: Option<u16>, end: Option<u16>) -> Self {
        self.start_year = start;
        self.end_year = end;
        self
    }

    /// Enable/disable the title filter
    pub fn filter_by_title(mut self, filter: bool) -> Self {
        self.filter_by_title = filter;
        self
    }

    /// Enable/disable deduplication against the known-title set
    pub fn exclude_duplicates(mut self, exclude: bool) -> Self {
        self.exclude_duplicates = exclude;
        self
    }

    /// Supply the known-title set used for deduplication
    pub fn known_titles(mut self, titles: HashSet<String>) -> Self {
        self.known_titles = titles;
        self
    }

    /// Keyword terms used by the title filter: comma-split, lower-cased
    pub fn keyword_terms(&self) -> Vec<String> {
        self.keyword
            .split(',')
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// Normalize a title for deduplication: lower-cased, whitespace collapsed.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A weak reference into the search engine's author identity space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    /// Author display name
    pub name: String,

    /// Profile page URL, absent when the byline anchor didn't match
    pub profile_url: Option<String>,
}

impl AuthorRef {
    /// Create an author reference with a profile URL
    pub fn new(name: impl Into<String>, profile_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            profile_url: Some(profile_url.into()),
        }
    }

    /// Create an author reference without a profile URL
    pub fn unlinked(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            profile_url: None,
        }
    }
}

/// One parsed bibliographic search result.
///
/// Created by the harvester from a single result block; never mutated after
/// creation except by the caller attaching resolved contacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Record title
    pub title: String,

    /// Author display string as shown in the byline
    pub authors: String,

    /// Up to three authors with profile links, in byline order
    pub author_refs: Vec<AuthorRef>,

    /// Venue name, or the sentinel "Venue not found"
    pub venue: String,

    /// Publisher name, or the sentinel "Publisher not found"
    pub publisher: String,

    /// Publication year, when one could be parsed
    pub year: Option<u16>,

    /// Citation count ("Cited by N"), 0 when absent
    pub citations: u32,

    /// Citations divided by years since publication, rounded to 2 decimals
    pub citations_per_year: f64,

    /// Snippet/abstract text
    pub description: Option<String>,

    /// Link target of the title, when present
    pub url: Option<String>,
}
