//! Terminal output: result and contact tables, status lines.

use comfy_table::{Attribute, Cell, Table};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

use crate::models::{ContactResult, Record};

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{cut}...")
}

/// Render harvested records as a table.
pub fn record_table(records: &[Record]) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec![
        "Title", "Authors", "Venue", "Year", "Citations", "Cites/Year",
    ]);

    for record in records {
        let year = record.year.map(|y| y.to_string()).unwrap_or_default();
        table.add_row(vec![
            Cell::new(truncate(&record.title, 50)).add_attribute(Attribute::Bold),
            Cell::new(truncate(&record.authors, 30)),
            Cell::new(truncate(&record.venue, 30)),
            Cell::new(year),
            Cell::new(record.citations),
            Cell::new(format!("{:.2}", record.citations_per_year)),
        ]);
    }
    table
}

/// Render resolved contacts as a table.
pub fn contact_table(contacts: &[ContactResult]) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Author", "Email", "Source", "Homepage"]);

    for contact in contacts {
        table.add_row(vec![
            Cell::new(&contact.name).add_attribute(Attribute::Bold),
            Cell::new(contact.email.as_deref().unwrap_or("-")),
            Cell::new(contact.source.as_str()),
            Cell::new(truncate(contact.homepage.as_deref().unwrap_or("-"), 45)),
        ]);
    }
    table
}

/// Print a green success line.
pub fn print_success(msg: &str) {
    if is_terminal() {
        println!("{} {}", "✓".green().bold(), msg);
    } else {
        println!("{msg}");
    }
}

/// Print a red failure line to stderr.
pub fn print_failure(msg: &str) {
    if is_terminal() {
        eprintln!("{} {}", "✗".red().bold(), msg);
    } else {
        eprintln!("{msg}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContactSource;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer title here", 10), "a much ...");
    }

    #[test]
    fn test_contact_table_renders_tags() {
        let contacts = vec![
            ContactResult {
                name: "J Doe".to_string(),
                email: Some("jdoe@cs.uni.edu".to_string()),
                source: ContactSource::PersonalWebsite,
                homepage: Some("https://jdoe.github.io".to_string()),
            },
            ContactResult::empty("No Link", ContactSource::NoScholarLink),
        ];
        let rendered = contact_table(&contacts).to_string();
        assert!(rendered.contains("jdoe@cs.uni.edu"));
        assert!(rendered.contains("personal_website"));
        assert!(rendered.contains("no_scholar_link"));
    }

    #[test]
    fn test_record_table_renders() {
        let record = Record {
            title: "A Study".to_string(),
            authors: "J Doe".to_string(),
            author_refs: vec![],
            venue: "Nature".to_string(),
            publisher: "nature.com".to_string(),
            year: Some(2020),
            citations: 12,
            citations_per_year: 2.4,
            description: None,
            url: None,
        };
        let rendered = record_table(&[record]).to_string();
        assert!(rendered.contains("A Study"));
        assert!(rendered.contains("2.40"));
    }
}
