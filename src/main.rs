use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use scholar_harvest::config::{get_config, load_config};
use scholar_harvest::models::{ProgressEvent, ProgressSink, ProgressStatus};
use scholar_harvest::ui;
use scholar_harvest::{AuthorRef, ContactResolver, ContactResult, Harvester, Record, SearchQuery};

/// Scholar Harvest - search Google Scholar and resolve author contact emails
#[derive(Parser, Debug)]
#[command(name = "scholar-harvest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search Google Scholar and resolve author contact emails", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Route requests through this proxy (overrides configuration)
    #[arg(long, global = true)]
    proxy: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search Google Scholar for publications
    Search {
        /// Search keyword(s), comma-separated for title filtering
        query: String,

        /// Number of results to collect
        #[arg(long, short = 'n', default_value_t = 10)]
        num_results: usize,

        /// Lower publication-year bound (inclusive)
        #[arg(long)]
        year_start: Option<u16>,

        /// Upper publication-year bound (inclusive)
        #[arg(long)]
        year_end: Option<u16>,

        /// Only keep results whose title contains one of the keywords
        #[arg(long, default_value_t = false)]
        filter_title: bool,

        /// Keep duplicate titles instead of skipping them
        #[arg(long, default_value_t = false)]
        no_dedup: bool,

        /// Open a visible browser when a bot challenge appears
        #[arg(long, default_value_t = false)]
        interactive_challenge: bool,
    },

    /// Resolve the contact email for one author profile
    Resolve {
        /// Author display name
        name: String,

        /// Google Scholar profile URL; omit for authors without one
        #[arg(long)]
        profile_url: Option<String>,
    },
}

/// Progress sink that narrates resolution steps on stderr.
struct StderrSink;

impl ProgressSink for StderrSink {
    fn emit(&self, event: ProgressEvent) {
        let marker = match event.status {
            ProgressStatus::Completed => "done",
            ProgressStatus::Failed => "failed",
            ProgressStatus::InProgress => "....",
        };
        eprintln!("[{marker}] {}: {}", event.title, event.description);
    }
}

fn resolve_format(format: OutputFormat) -> OutputFormat {
    if format == OutputFormat::Auto {
        if ui::is_terminal() {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    } else {
        format
    }
}

fn output_records(records: &[Record], format: OutputFormat) -> Result<()> {
    match resolve_format(format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Plain => {
            for record in records {
                let year = record.year.map(|y| y.to_string()).unwrap_or_default();
                println!(
                    "{} - {} ({}, {})",
                    record.title, record.authors, record.venue, year
                );
                if let Some(ref url) = record.url {
                    println!("  URL: {url}");
                }
                println!("  Citations: {} ({:.2}/year)", record.citations, record.citations_per_year);
                println!();
            }
        }
        OutputFormat::Table | OutputFormat::Auto => println!("{}", ui::record_table(records)),
    }
    Ok(())
}

fn output_contacts(contacts: &[ContactResult], format: OutputFormat) -> Result<()> {
    match resolve_format(format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(contacts)?),
        OutputFormat::Plain => {
            for contact in contacts {
                println!(
                    "{}: {} [{}]",
                    contact.name,
                    contact.email.as_deref().unwrap_or("-"),
                    contact.source
                );
            }
        }
        OutputFormat::Table | OutputFormat::Auto => println!("{}", ui::contact_table(contacts)),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("scholar_harvest={env_filter}")),
        ))
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => get_config(),
    };
    if let Some(proxy) = &cli.proxy {
        config.proxy.enabled = true;
        config.proxy.url = proxy.clone();
    }

    match cli.command {
        Commands::Search {
            query,
            num_results,
            year_start,
            year_end,
            filter_title,
            no_dedup,
            interactive_challenge,
        } => {
            if interactive_challenge {
                config.challenge.mode = scholar_harvest::config::ChallengeMode::InteractiveBrowser;
            }

            let search = SearchQuery::new(&query)
                .num_results(num_results)
                .years(year_start, year_end)
                .filter_by_title(filter_title)
                .exclude_duplicates(!no_dedup);

            let harvester = match Harvester::connect(&config).await {
                Ok(h) => h,
                Err(err) => {
                    ui::print_failure(&err.user_message());
                    return Err(err.into());
                }
            };

            match harvester.search(&search).await {
                Ok(records) => {
                    output_records(&records, cli.output)?;
                    if !cli.quiet {
                        ui::print_success(&format!("{} record(s) collected", records.len()));
                    }
                }
                Err(err) => {
                    ui::print_failure(&err.user_message());
                    return Err(err.into());
                }
            }
        }

        Commands::Resolve { name, profile_url } => {
            let resolver = ContactResolver::connect(&config).await?;
            let author = match profile_url {
                Some(url) => AuthorRef::new(name, url),
                None => AuthorRef::unlinked(name),
            };

            let contacts = if cli.quiet {
                resolver
                    .resolve_batch(&[author], &scholar_harvest::models::NullSink)
                    .await
            } else {
                resolver.resolve_batch(&[author], &StderrSink).await
            };

            output_contacts(&contacts, cli.output)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_search() {
        let cli = Cli::parse_from([
            "scholar-harvest",
            "search",
            "graph neural networks",
            "-n",
            "25",
            "--year-start",
            "2018",
            "--filter-title",
        ]);
        match cli.command {
            Commands::Search {
                query,
                num_results,
                year_start,
                filter_title,
                no_dedup,
                ..
            } => {
                assert_eq!(query, "graph neural networks");
                assert_eq!(num_results, 25);
                assert_eq!(year_start, Some(2018));
                assert!(filter_title);
                assert!(!no_dedup);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn test_cli_parses_resolve() {
        let cli = Cli::parse_from([
            "scholar-harvest",
            "-v",
            "resolve",
            "J Doe",
            "--profile-url",
            "https://scholar.google.com/citations?user=abc",
        ]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Resolve { name, profile_url } => {
                assert_eq!(name, "J Doe");
                assert!(profile_url.is_some());
            }
            _ => panic!("expected resolve command"),
        }
    }
}
