//! Email address extraction in three tiers: plain addresses, obfuscated
//! "AT"/"DOT" spellings, and merged `{a,b,c}@domain` groups.
//!
//! Every candidate passes through a validity check and a configurable
//! spam filter before it is surfaced.

use regex::Regex;

use crate::config::EmailFilterConfig;

const PLAIN_PATTERN: &str = r"\b[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}\b";

// local [at] part dot part dot ... tld, with bracketed, parenthesised or
// bare word markers
const OBFUSCATED_PATTERN: &str = r"(?i)\b([a-z0-9._%+-]+)\s*(?:\[\s*at\s*\]|\(\s*at\s*\)|\bat\b)\s*((?:[a-z0-9-]+\s*(?:\[\s*dot\s*\]|\(\s*dot\s*\)|\bdot\b)\s*)+)([a-z]{2,})\b";

// local [at] mail.example.edu.cn, where the domain already carries its dots
const COMPLETE_DOMAIN_PATTERN: &str =
    r"(?i)\b([a-z0-9._%+-]+)\s*(?:\[\s*at\s*\]|\(\s*at\s*\))\s*([a-z0-9-]+(?:\.[a-z0-9-]+)+)\b";

// {alice,bob,carol}@cs.example.edu
const MERGED_PATTERN: &str = r"(?i)\{([^}]+)\}\s*@\s*([a-z0-9.-]+\.[a-z]{2,})";

const DOT_MARKER_PATTERN: &str = r"(?i)\s*(?:\[\s*dot\s*\]|\(\s*dot\s*\)|\bdot\b)\s*";

const VALID_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

const MAX_EMAIL_LEN: usize = 254;

/// Compiled matcher for all three extraction tiers plus filtering.
#[derive(Debug)]
pub struct EmailMatcher {
    plain: Regex,
    obfuscated: Regex,
    complete_domain: Regex,
    merged: Regex,
    dot_marker: Regex,
    valid: Regex,
    filter: EmailFilterConfig,
}

impl EmailMatcher {
    pub fn new(filter: EmailFilterConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            plain: Regex::new(PLAIN_PATTERN)?,
            obfuscated: Regex::new(OBFUSCATED_PATTERN)?,
            complete_domain: Regex::new(COMPLETE_DOMAIN_PATTERN)?,
            merged: Regex::new(MERGED_PATTERN)?,
            dot_marker: Regex::new(DOT_MARKER_PATTERN)?,
            valid: Regex::new(VALID_PATTERN)?,
            filter,
        })
    }

    /// Plain `user@domain.tld` addresses, in document order
    pub fn find_plain(&self, text: &str) -> Vec<String> {
        self.plain
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect()
    }

    /// De-obfuscated addresses from AT/DOT spellings, both the
    /// dotted-word form and the complete-domain form
    pub fn find_obfuscated(&self, text: &str) -> Vec<String> {
        let mut found = Vec::new();

        for caps in self.obfuscated.captures_iter(text) {
            let local = &caps[1];
            let domain_part = self.normalize_domain(&caps[2]);
            let tld = &caps[3];
            if !domain_part.is_empty() {
                found.push(format!("{local}@{domain_part}.{tld}").to_lowercase());
            }
        }

        for caps in self.complete_domain.captures_iter(text) {
            found.push(format!("{}@{}", &caps[1], &caps[2]).to_lowercase());
        }

        found
    }

    /// Expanded `{a,b,c}@domain` groups, one address per listed user
    pub fn find_merged(&self, text: &str) -> Vec<String> {
        let mut found = Vec::new();
        for caps in self.merged.captures_iter(text) {
            let domain = caps[2].to_lowercase();
            for user in caps[1].split(',') {
                let user = user.trim();
                if !user.is_empty() {
                    found.push(format!("{}@{}", user.to_lowercase(), domain));
                }
            }
        }
        found
    }

    /// All tiers combined, deduplicated, filtered, in discovery order
    pub fn find_all(&self, text: &str) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut results = Vec::new();

        let candidates = self
            .find_plain(text)
            .into_iter()
            .chain(self.find_obfuscated(text))
            .chain(self.find_merged(text));

        for email in candidates {
            if self.accept(&email) && seen.insert(email.clone()) {
                results.push(email);
            }
        }
        results
    }

    /// Structural validity: one local part, one dotted domain, sane length
    pub fn is_valid(&self, email: &str) -> bool {
        email.len() <= MAX_EMAIL_LEN && self.valid.is_match(email)
    }

    /// Whether the address trips the configured spam filter
    pub fn is_spam(&self, email: &str) -> bool {
        let lower = email.to_lowercase();
        let (local, domain) = match lower.split_once('@') {
            Some(parts) => parts,
            None => return true,
        };

        if self.filter.spam_domains.iter().any(|d| domain.contains(d.as_str())) {
            return true;
        }
        if self.filter.spam_prefixes.iter().any(|p| local == p.as_str()) {
            return true;
        }
        if self.filter.test_patterns.iter().any(|p| local.contains(p.as_str())) {
            return true;
        }
        false
    }

    /// Valid and not spam
    pub fn accept(&self, email: &str) -> bool {
        self.is_valid(email) && !self.is_spam(email)
    }

    // "cs dot x dot" or "cs[dot]x[dot]" becomes "cs.x"
    fn normalize_domain(&self, segment: &str) -> String {
        let dotted = self.dot_marker.replace_all(segment, ".");
        dotted
            .split('.')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(".")
    }
}
