//! Email extraction from a personal homepage.
//!
//! Tiers run in confidence order: mailto anchors anywhere on the page,
//! mailto anchors inside contact-flavored sections, then plain,
//! obfuscated, and merged addresses in the page text. The primary email
//! is the first hit of the first tier that produced one.

use scraper::{Html, Selector};

use crate::extract::EmailMatcher;

const CONTACT_SECTIONS: &str = ".contact, .email, #contact, #email, \
    .contact-info, .contact-email, .author-email, \
    footer, .footer, #footer, .about, #about, .bio, #bio";

/// Emails found on one page, primary first.
#[derive(Debug, Default)]
pub struct PageEmails {
    pub primary: Option<String>,
    pub all: Vec<String>,
}

fn mailto_address(href: &str) -> Option<String> {
    let rest = href.strip_prefix("mailto:")?;
    let email = rest.split(['?', '&']).next()?.trim();
    if email.is_empty() {
        None
    } else {
        Some(email.to_lowercase())
    }
}

fn mailto_links(scope: &Html, selector: &Selector, mailto_sel: &Selector) -> Vec<String> {
    scope
        .select(selector)
        .flat_map(|section| {
            section
                .select(mailto_sel)
                .filter_map(|a| a.value().attr("href").and_then(mailto_address))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Run all extraction tiers over a page.
pub fn extract_page_emails(html: &str, matcher: &EmailMatcher) -> PageEmails {
    let document = Html::parse_document(html);

    let mailto_sel = match Selector::parse(r#"a[href^="mailto:"]"#) {
        Ok(sel) => sel,
        Err(_) => return PageEmails::default(),
    };

    // tier 1: every mailto anchor on the page
    let mut tiers: Vec<Vec<String>> = Vec::new();
    tiers.push(
        document
            .select(&mailto_sel)
            .filter_map(|a| a.value().attr("href").and_then(mailto_address))
            .collect(),
    );

    // tier 2: mailto anchors inside contact sections
    if let Ok(sections) = Selector::parse(CONTACT_SECTIONS) {
        tiers.push(mailto_links(&document, &sections, &mailto_sel));
    }

    // tiers 3-5: addresses in the visible text
    let text = document.root_element().text().collect::<String>();
    tiers.push(matcher.find_plain(&text));
    tiers.push(matcher.find_obfuscated(&text));
    tiers.push(matcher.find_merged(&text));

    let mut seen = std::collections::HashSet::new();
    let mut emails = PageEmails::default();

    for tier in tiers {
        for email in tier {
            if !matcher.accept(&email) {
                continue;
            }
            if seen.insert(email.clone()) {
                if emails.primary.is_none() {
                    emails.primary = Some(email.clone());
                }
                emails.all.push(email);
            }
        }
    }

    tracing::debug!(found = emails.all.len(), "homepage email extraction finished");
    emails
}
