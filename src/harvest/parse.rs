//! Parsing of Google Scholar result pages into [`Record`]s.
//!
//! The markup here is adversarial: bylines are free text, years float
//! inside venue strings, and citation counts live in footer link labels.
//! The small string helpers are kept pure so they can be tested without
//! any HTML fixtures.

use scraper::{ElementRef, Html, Selector};

use crate::models::{AuthorRef, Record};

pub const VENUE_NOT_FOUND: &str = "Venue not found";
pub const PUBLISHER_NOT_FOUND: &str = "Publisher not found";

/// Most bylines link at most the first few authors; anything past three
/// is noise from suggestion widgets.
const MAX_AUTHOR_LINKS: usize = 3;

/// Outcome of parsing one result page.
#[derive(Debug, Default)]
pub struct PageParse {
    /// Number of result blocks present, parseable or not. Zero blocks
    /// means the result set is exhausted.
    pub block_count: usize,
    pub records: Vec<Record>,
}

/// Citation count from a "Cited by N" label, 0 when absent
pub fn parse_citations(text: &str) -> u32 {
    match text.find("Cited by ") {
        Some(idx) => text[idx + 9..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse()
            .unwrap_or(0),
        None => 0,
    }
}

/// Publication year from a byline.
///
/// Scans for each '-' and accepts the four characters two positions to
/// its left when they are all digits, matching the ", 2019 - publisher"
/// shape. Returns `None` when no dash carries a year.
pub fn parse_year(byline: &str) -> Option<u16> {
    let chars: Vec<char> = byline.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if *c != '-' || i < 5 {
            continue;
        }
        let window = &chars[i - 5..i - 1];
        if window.iter().all(|c| c.is_ascii_digit()) {
            let year: String = window.iter().collect();
            if let Ok(y) = year.parse() {
                return Some(y);
            }
        }
    }
    None
}

/// Author display string for a byline with no profile links.
///
/// Bylines open with a two-character ornament before the author list, so
/// the slice runs from offset 2 to just before the first dash.
pub fn heuristic_author(byline: &str) -> String {
    let chars: Vec<char> = byline.chars().collect();
    let dash = match chars.iter().position(|c| *c == '-') {
        Some(idx) if idx > 2 => idx,
        _ => return byline.trim().to_string(),
    };
    chars[2..dash - 1].iter().collect::<String>().trim().to_string()
}

/// Venue and publisher from a byline split on '-'.
///
/// The last segment is the publisher; the second-to-last holds the venue.
/// The venue drops its final comma-separated token (the year slot) and
/// rejoins the rest on single spaces, so a segment with no comma yields
/// an empty venue.
pub fn split_venue_publisher(byline: &str) -> (String, String) {
    let parts: Vec<&str> = byline.split('-').collect();

    let publisher = if parts.len() >= 2 {
        parts[parts.len() - 1].trim().to_string()
    } else {
        PUBLISHER_NOT_FOUND.to_string()
    };

    let venue = if parts.len() >= 3 {
        let segments: Vec<&str> = parts[parts.len() - 2].split(',').collect();
        segments[..segments.len() - 1].join(" ").trim().to_string()
    } else {
        VENUE_NOT_FOUND.to_string()
    };

    (venue, publisher)
}

/// Citations per year, rounded to two decimals; 0 unless both the count
/// and the year are known
pub fn citations_per_year(citations: u32, year: Option<u16>, current_year: u16) -> f64 {
    let year = match year {
        Some(y) if y > 0 && citations > 0 => y,
        _ => return 0.0,
    };
    let span = current_year.saturating_sub(year).max(1);
    let raw = citations as f64 / span as f64;
    (raw * 100.0).round() / 100.0
}

fn absolute_url(href: &str, base_url: &str) -> String {
    if href.starts_with('/') {
        format!("{}{}", base_url.trim_end_matches('/'), href)
    } else {
        href.to_string()
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

// "[PDF][B] Some title" keeps its bracketed format markers when the h3
// has no anchor; strip them from the front
fn strip_format_markers(title: &str) -> String {
    let mut rest = title.trim_start();
    while rest.starts_with('[') {
        match rest.find(']') {
            Some(idx) => rest = rest[idx + 1..].trim_start(),
            None => break,
        }
    }
    rest.to_string()
}

fn parse_result_block(
    block: ElementRef<'_>,
    base_url: &str,
    current_year: u16,
) -> Option<Record> {
    let title_link_sel = Selector::parse("h3.gs_rt a").ok()?;
    let title_sel = Selector::parse("h3.gs_rt").ok()?;
    let byline_sel = Selector::parse("div.gs_a").ok()?;
    let byline_link_sel = Selector::parse("div.gs_a a").ok()?;
    let snippet_sel = Selector::parse("div.gs_rs").ok()?;
    let footer_link_sel = Selector::parse("div.gs_fl a").ok()?;

    let (title, url) = match block.select(&title_link_sel).next() {
        Some(anchor) => {
            let url = anchor
                .value()
                .attr("href")
                .map(|href| absolute_url(href, base_url));
            (element_text(anchor), url)
        }
        None => {
            let h3 = block.select(&title_sel).next()?;
            (strip_format_markers(&element_text(h3)), None)
        }
    };
    if title.is_empty() {
        return None;
    }

    let byline = block
        .select(&byline_sel)
        .next()
        .map(element_text)
        .unwrap_or_default();

    let author_refs: Vec<AuthorRef> = block
        .select(&byline_link_sel)
        .filter(|a| {
            a.value()
                .attr("href")
                .is_some_and(|h| h.contains("citations?user="))
        })
        .take(MAX_AUTHOR_LINKS)
        .filter_map(|a| {
            let name = element_text(a);
            let href = a.value().attr("href")?;
            if name.is_empty() {
                return None;
            }
            Some(AuthorRef::new(name, absolute_url(href, base_url)))
        })
        .collect();

    let authors = if author_refs.is_empty() {
        heuristic_author(&byline)
    } else {
        author_refs
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let (venue, publisher) = split_venue_publisher(&byline);
    let year = parse_year(&byline);

    let citations = block
        .select(&footer_link_sel)
        .map(element_text)
        .find(|t| t.starts_with("Cited by"))
        .map(|t| parse_citations(&t))
        .unwrap_or(0);

    let description = block.select(&snippet_sel).next().map(element_text);

    Some(Record {
        title,
        authors,
        author_refs,
        venue,
        publisher,
        year,
        citations,
        citations_per_year: citations_per_year(citations, year, current_year),
        description,
        url,
    })
}

/// Parse every result block on a page.
pub fn parse_page(html: &str, base_url: &str, current_year: u16) -> PageParse {
    let block_sel = match Selector::parse("div.gs_or") {
        Ok(sel) => sel,
        Err(_) => return PageParse::default(),
    };

    let document = Html::parse_document(html);
    let mut parse = PageParse::default();

    for block in document.select(&block_sel) {
        parse.block_count += 1;
        match parse_result_block(block, base_url, current_year) {
            Some(record) => parse.records.push(record),
            None => tracing::debug!("skipping unparseable result block"),
        }
    }

    tracing::debug!(
        blocks = parse.block_count,
        parsed = parse.records.len(),
        "result page parsed"
    );
    parse
}
