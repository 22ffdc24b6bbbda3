//! PDF fallback: when a homepage yields nothing, mine the author's
//! recent papers for a contact address.
//!
//! Candidate PDFs come from three places on the profile page: the
//! `citation_pdf_url` meta tags, the first PDF link on each of the first
//! few paper detail pages, and PDF links sitting directly on the profile.
//! At most five candidates are kept, at most three are downloaded, and
//! collection stops at three distinct addresses.

use scraper::{Html, Selector};

use crate::extract::{first_page_text, EmailMatcher};
use crate::fetch::PageFetcher;

pub const MAX_CANDIDATE_URLS: usize = 5;
const MAX_PAPER_PAGES: usize = 5;
const MAX_PDF_ATTEMPTS: usize = 3;
pub const MAX_FALLBACK_EMAILS: usize = 3;

fn is_pdf_href(href: &str) -> bool {
    let lower = href.to_lowercase();
    lower.contains(".pdf") || lower.contains("arxiv.org/pdf")
}

fn absolute(href: &str, base_url: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with('/') {
        format!("{}{}", base_url.trim_end_matches('/'), href)
    } else {
        format!("https://{href}")
    }
}

// <meta name="citation_pdf_url" content="...">
fn meta_pdf_urls(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(sel) = Selector::parse(r#"meta[name="citation_pdf_url"]"#) else {
        return Vec::new();
    };
    document
        .select(&sel)
        .filter_map(|meta| meta.value().attr("content"))
        .filter(|c| !c.is_empty())
        .map(|c| {
            if c.starts_with("http") {
                c.to_string()
            } else if let Some(rest) = c.strip_prefix("//") {
                format!("http://{rest}")
            } else {
                format!("http://{c}")
            }
        })
        .collect()
}

// paper title anchors on the profile, capped
fn paper_detail_urls(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(sel) = Selector::parse("a.gsc_a_at") else {
        return Vec::new();
    };
    document
        .select(&sel)
        .filter_map(|a| a.value().attr("href"))
        .take(MAX_PAPER_PAGES)
        .map(|href| absolute(href, base_url))
        .collect()
}

fn direct_pdf_urls(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&sel)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| is_pdf_href(href))
        .map(|href| absolute(href, base_url))
        .collect()
}

/// First PDF link on a paper detail page
pub fn first_pdf_link(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let sel = Selector::parse("a[href]").ok()?;
    document
        .select(&sel)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| is_pdf_href(href))
        .map(|href| {
            if href.starts_with("http") {
                href.to_string()
            } else if let Some(rest) = href.strip_prefix("//") {
                format!("https://{rest}")
            } else {
                format!("https://{}", href.trim_start_matches('/'))
            }
        })
}

/// Collect candidate PDF URLs for an author, deduplicated in discovery
/// order and capped at [`MAX_CANDIDATE_URLS`].
pub async fn candidate_pdf_urls(
    fetcher: &PageFetcher,
    profile_html: &str,
    base_url: &str,
) -> Vec<String> {
    let mut urls = meta_pdf_urls(profile_html);
    let papers = paper_detail_urls(profile_html, base_url);
    let direct = direct_pdf_urls(profile_html, base_url);

    for paper_url in papers {
        match fetcher.fetch(&paper_url).await {
            Ok((_, html)) => {
                if let Some(pdf) = first_pdf_link(&html) {
                    urls.push(pdf);
                }
            }
            Err(err) => {
                tracing::debug!(url = %paper_url, error = %err, "paper page fetch failed");
            }
        }
    }
    urls.extend(direct);

    let mut seen = std::collections::HashSet::new();
    urls.retain(|u| seen.insert(u.clone()));
    urls.truncate(MAX_CANDIDATE_URLS);

    tracing::debug!(candidates = urls.len(), "pdf candidates collected");
    urls
}

/// Download up to three candidate PDFs and harvest distinct addresses
/// from their first pages, stopping at [`MAX_FALLBACK_EMAILS`].
pub async fn collect_emails(
    fetcher: &PageFetcher,
    matcher: &EmailMatcher,
    urls: &[String],
) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut emails: Vec<String> = Vec::new();

    for url in urls.iter().take(MAX_PDF_ATTEMPTS) {
        let bytes = match fetcher.fetch_bytes(url).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(%url, error = %err, "pdf download failed");
                continue;
            }
        };

        let text = match tokio::task::spawn_blocking(move || first_page_text(&bytes)).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::debug!(%url, "no text recovered from pdf");
                continue;
            }
            Err(err) => {
                tracing::debug!(%url, error = %err, "pdf extraction task failed");
                continue;
            }
        };

        if absorb_document_emails(&text, matcher, &mut seen, &mut emails) {
            break;
        }
    }
    emails
}

/// Fold one document's addresses into the running set, stopping at
/// [`MAX_FALLBACK_EMAILS`]. Returns true once the cap is reached.
fn absorb_document_emails(
    text: &str,
    matcher: &EmailMatcher,
    seen: &mut std::collections::HashSet<String>,
    emails: &mut Vec<String>,
) -> bool {
    for email in matcher.find_all(text) {
        if emails.len() >= MAX_FALLBACK_EMAILS {
            return true;
        }
        if seen.insert(email.clone()) {
            tracing::debug!(%email, "email found in pdf");
            emails.push(email);
        }
    }
    emails.len() >= MAX_FALLBACK_EMAILS
}
