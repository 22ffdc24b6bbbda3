//! End-to-end pipeline tests against a mock HTTP server.

use std::collections::HashSet;
use std::sync::Arc;

use scholar_harvest::config::Config;
use scholar_harvest::models::NullSink;
use scholar_harvest::{
    AuthorRef, ContactResolver, ContactSource, HarvestError, Harvester, SearchQuery,
};

fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.harvest.base_url = base_url.to_string();
    config.harvest.request_delay_secs = 0;
    config.harvest.rate_limit_backoff_secs = 0;
    config
}

fn result_block(title: &str, byline: &str, profile_href: Option<&str>) -> String {
    let byline_html = match profile_href {
        Some(href) => format!(r#"<a href="{href}">{byline}</a> - Journal, 2020 - pub.org"#),
        None => byline.to_string(),
    };
    format!(
        r#"<div class="gs_r gs_or gs_scl">
            <h3 class="gs_rt"><a href="https://doi.example.org/x">{title}</a></h3>
            <div class="gs_a">{byline_html}</div>
            <div class="gs_fl"><a href="/c">Cited by 7</a></div>
        </div>"#
    )
}

fn page_of(blocks: &[String]) -> String {
    format!("<html><body>{}</body></html>", blocks.join("\n"))
}

#[tokio::test]
async fn search_respects_known_titles_and_pagination() {
    let mut server = mockito::Server::new_async().await;

    let first_page: Vec<String> = (1..=10)
        .map(|i| result_block(&format!("Paper {i}"), "J Doe - Journal, 2020 - pub.org", None))
        .collect();
    let second_page = vec![
        result_block("Paper 11", "J Doe - Journal, 2021 - pub.org", None),
        result_block("PAPER   3", "J Doe - Journal, 2021 - pub.org", None),
    ];

    server
        .mock("GET", mockito::Matcher::Regex("start=0".to_string()))
        .with_body(page_of(&first_page))
        .create_async()
        .await;
    server
        .mock("GET", mockito::Matcher::Regex("start=10".to_string()))
        .with_body(page_of(&second_page))
        .create_async()
        .await;
    server
        .mock("GET", mockito::Matcher::Regex("start=20".to_string()))
        .with_body("<html><body>exhausted</body></html>")
        .create_async()
        .await;

    let harvester = Harvester::connect(&test_config(&server.url())).await.unwrap();
    let query = SearchQuery::new("paper")
        .num_results(50)
        .exclude_duplicates(true)
        .known_titles(HashSet::from(["paper 1".to_string(), "paper 3".to_string()]));

    let records = harvester.search(&query).await.unwrap();
    let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();

    // "Paper 1" and "Paper 3" were already known; "PAPER   3" on page 2
    // normalizes onto the same known title
    assert!(!titles.contains(&"Paper 1"));
    assert!(!titles.contains(&"Paper 3"));
    assert!(!titles.contains(&"PAPER   3"));
    assert!(titles.contains(&"Paper 11"));
    assert_eq!(records.len(), 9);
}

#[tokio::test]
async fn search_carries_author_profile_links() {
    let mut server = mockito::Server::new_async().await;
    let block = result_block(
        "Linked Paper",
        "J Doe",
        Some("/citations?user=abc123&hl=en"),
    );
    server
        .mock("GET", mockito::Matcher::Regex("start=0".to_string()))
        .with_body(page_of(&[block]))
        .create_async()
        .await;
    server
        .mock("GET", mockito::Matcher::Regex("start=10".to_string()))
        .with_body("<html><body></body></html>")
        .create_async()
        .await;

    let harvester = Harvester::connect(&test_config(&server.url())).await.unwrap();
    let records = harvester
        .search(&SearchQuery::new("linked").num_results(5))
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    let refs = &records[0].author_refs;
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].name, "J Doe");
    assert_eq!(
        refs[0].profile_url.as_deref(),
        Some(format!("{}/citations?user=abc123&hl=en", server.url()).as_str())
    );
}

#[tokio::test]
async fn persistent_rate_limit_aborts_with_classified_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", mockito::Matcher::Regex("start=0".to_string()))
        .with_status(429)
        .expect(2)
        .create_async()
        .await;

    let harvester = Harvester::connect(&test_config(&server.url())).await.unwrap();
    let err = harvester
        .search(&SearchQuery::new("anything"))
        .await
        .unwrap_err();

    assert!(matches!(err, HarvestError::RateLimited));
    assert!(err.user_message().contains("rate limiting"));
}

#[tokio::test]
async fn resolve_walks_homepage_then_pdf_fallback() {
    let mut server = mockito::Server::new_async().await;

    // profile with a homepage link and one paper
    server
        .mock("GET", "/citations")
        .match_query(mockito::Matcher::Any)
        .with_body(format!(
            r#"<html><body>
                <div id="gsc_prf_ivh"><a href="{0}/home/jdoe.github.io">Homepage</a></div>
                <a class="gsc_a_at" href="/paper/1">First Paper</a>
            </body></html>"#,
            server.url()
        ))
        .create_async()
        .await;
    // homepage with no email forces the PDF fallback
    server
        .mock("GET", "/home/jdoe.github.io")
        .with_body("<html><body>welcome, no contact info here</body></html>")
        .create_async()
        .await;
    // the paper page links a PDF, which turns out unreadable
    server
        .mock("GET", "/paper/1")
        .with_body(format!(
            r#"<a href="{}/files/paper1.pdf">PDF</a>"#,
            server.url()
        ))
        .create_async()
        .await;
    server
        .mock("GET", "/files/paper1.pdf")
        .with_body("not really a pdf")
        .create_async()
        .await;

    let resolver = ContactResolver::connect(&test_config(&server.url())).await.unwrap();
    let author = AuthorRef::new("J Doe", format!("{}/citations?user=abc", server.url()));
    let result = resolver.resolve_author(&author, &NullSink).await.unwrap();

    // homepage existed but neither tier produced an email
    assert_eq!(result.source, ContactSource::NotFoundInPdf);
    assert!(result.email.is_none());
    assert!(result
        .homepage
        .as_deref()
        .is_some_and(|h| h.ends_with("jdoe.github.io")));
}

#[tokio::test]
async fn resolve_batch_mixes_outcomes() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/citations")
        .match_query(mockito::Matcher::Any)
        .with_body(format!(
            r#"<div id="gsc_prf_ivh"><a href="{0}/home/asmith.github.io">Homepage</a></div>"#,
            server.url()
        ))
        .create_async()
        .await;
    server
        .mock("GET", "/home/asmith.github.io")
        .with_body(r#"<a href="mailto:asmith@cs.uni.edu">email</a>"#)
        .create_async()
        .await;

    let resolver = ContactResolver::connect(&test_config(&server.url())).await.unwrap();
    let authors = vec![
        AuthorRef::new("A Smith", format!("{}/citations?user=a", server.url())),
        AuthorRef::unlinked("No Profile"),
    ];

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let sink = scholar_harvest::models::ChannelSink::new(tx);
    let results = resolver.resolve_batch(&authors, &sink).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].source, ContactSource::PersonalWebsite);
    assert_eq!(results[0].email.as_deref(), Some("asmith@cs.uni.edu"));
    assert_eq!(results[1].source, ContactSource::NoScholarLink);

    let mut steps = Vec::new();
    while let Ok(event) = rx.try_recv() {
        steps.push(event.step);
    }
    assert_eq!(steps.first().map(String::as_str), Some("start_extraction"));
    assert_eq!(
        steps.last().map(String::as_str),
        Some("extraction_complete")
    );
    assert!(steps.iter().any(|s| s == "extract_personal_homepage"));
    assert!(steps.iter().any(|s| s == "extract_from_website"));
}

#[tokio::test]
async fn challenge_handler_is_pluggable_end_to_end() {
    use scholar_harvest::harvest::challenge::{ChallengeError, ChallengeHandler};

    struct AlwaysSolves;
    impl ChallengeHandler for AlwaysSolves {
        fn resolve(&self, _url: &str) -> Result<String, ChallengeError> {
            Ok(page_of(&[result_block(
                "After Challenge",
                "J Doe - Journal, 2020 - pub.org",
                None,
            )]))
        }
    }

    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", mockito::Matcher::Regex("start=0".to_string()))
        .with_body("detected unusual traffic from your computer network")
        .create_async()
        .await;
    server
        .mock("GET", mockito::Matcher::Regex("start=10".to_string()))
        .with_body("<html><body></body></html>")
        .create_async()
        .await;

    let harvester = Harvester::connect(&test_config(&server.url()))
        .await
        .unwrap()
        .with_challenge_handler(Arc::new(AlwaysSolves));

    let records = harvester.search(&SearchQuery::new("x")).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "After Challenge");
}
