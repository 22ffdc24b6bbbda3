//! Tiered author-contact resolution.
//!
//! For each author: fetch the profile, look for a personal homepage,
//! mine the homepage for an email, and fall back to the author's paper
//! PDFs when that fails. Authors without a profile link are answered
//! without any network traffic. Batches run strictly sequentially and
//! one author's failure never aborts the rest.

pub mod homepage;
pub mod page;
pub mod pdf_fallback;

use thiserror::Error;

use crate::config::Config;
use crate::extract::EmailMatcher;
use crate::fetch::{FetchError, PageFetcher};
use crate::models::{
    AuthorRef, ContactResult, ContactSource, ProgressEvent, ProgressSink, ProgressStatus,
};
use homepage::HomepageDiscovery;
use page::PageEmails;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("invalid extraction pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Sequential contact resolver for one session.
pub struct ContactResolver {
    fetcher: PageFetcher,
    homepage: HomepageDiscovery,
    matcher: EmailMatcher,
    base_url: String,
}

impl ContactResolver {
    pub async fn connect(config: &Config) -> Result<Self, ResolveError> {
        Ok(Self {
            fetcher: PageFetcher::connect(config).await?,
            homepage: HomepageDiscovery::new(config.homepage.clone())?,
            matcher: EmailMatcher::new(config.email_filter.clone())?,
            base_url: config.harvest.base_url.clone(),
        })
    }

    /// Resolve a batch of authors one after another.
    ///
    /// Per-author failures are contained: the failing author gets an
    /// `error`-tagged result and the batch continues.
    pub async fn resolve_batch(
        &self,
        authors: &[AuthorRef],
        sink: &dyn ProgressSink,
    ) -> Vec<ContactResult> {
        sink.emit(ProgressEvent::new(
            "start_extraction",
            "Extracting author contacts",
            format!("{} author(s) queued", authors.len()),
            ProgressStatus::InProgress,
        ));

        let mut results = Vec::with_capacity(authors.len());
        for author in authors {
            match self.resolve_author(author, sink).await {
                Ok(result) => results.push(result),
                Err(err) => {
                    tracing::warn!(author = %author.name, error = %err, "author resolution failed");
                    results.push(ContactResult::empty(&author.name, ContactSource::Error));
                }
            }
        }

        let found = results.iter().filter(|r| r.email.is_some()).count();
        let payload = serde_json::to_value(&results).unwrap_or(serde_json::Value::Null);
        sink.emit(
            ProgressEvent::new(
                "extraction_complete",
                "Contact extraction complete",
                format!("{found}/{} author(s) resolved", results.len()),
                ProgressStatus::Completed,
            )
            .result(serde_json::json!({ "author_emails": payload })),
        );

        results
    }

    /// Resolve one author through the homepage and PDF tiers.
    pub async fn resolve_author(
        &self,
        author: &AuthorRef,
        sink: &dyn ProgressSink,
    ) -> Result<ContactResult, FetchError> {
        let Some(profile_url) = &author.profile_url else {
            tracing::debug!(author = %author.name, "no profile link, skipping network lookups");
            return Ok(ContactResult::empty(
                &author.name,
                ContactSource::NoScholarLink,
            ));
        };

        sink.emit(ProgressEvent::new(
            "extract_personal_homepage",
            "Extracting personal homepage",
            format!("Looking up the homepage link for {}", author.name),
            ProgressStatus::InProgress,
        ));

        let (_, profile_html) = self.fetcher.fetch(profile_url).await?;

        match self.homepage.discover(&profile_html) {
            Some(site) => {
                sink.emit(ProgressEvent::new(
                    "extract_from_website",
                    "Extracting email from personal website",
                    format!("Reading {site} for {}", author.name),
                    ProgressStatus::InProgress,
                ));

                let emails = match self.fetcher.fetch(&site).await {
                    Ok((_, html)) => page::extract_page_emails(&html, &self.matcher),
                    Err(err) => {
                        tracing::warn!(url = %site, error = %err, "homepage fetch failed");
                        PageEmails::default()
                    }
                };

                if let Some(primary) = emails.primary {
                    tracing::info!(author = %author.name, email = %primary, "email found on homepage");
                    return Ok(ContactResult {
                        name: author.name.clone(),
                        email: Some(primary),
                        source: ContactSource::PersonalWebsite,
                        homepage: Some(site),
                    });
                }

                let pdf_emails = self.pdf_fallback(&author.name, &profile_html, sink).await;
                match pdf_emails.into_iter().next() {
                    Some(email) => Ok(ContactResult {
                        name: author.name.clone(),
                        email: Some(email),
                        source: ContactSource::PdfFallback,
                        homepage: Some(site),
                    }),
                    None => Ok(ContactResult::empty(
                        &author.name,
                        ContactSource::NotFoundInPdf,
                    )
                    .homepage(site)),
                }
            }
            None => {
                tracing::debug!(author = %author.name, "no personal homepage on profile");
                let pdf_emails = self.pdf_fallback(&author.name, &profile_html, sink).await;
                match pdf_emails.into_iter().next() {
                    Some(email) => Ok(ContactResult {
                        name: author.name.clone(),
                        email: Some(email),
                        source: ContactSource::PdfFallback,
                        homepage: None,
                    }),
                    None => Ok(ContactResult::empty(
                        &author.name,
                        ContactSource::NoHomepageAndNotInPdf,
                    )),
                }
            }
        }
    }

    async fn pdf_fallback(
        &self,
        author_name: &str,
        profile_html: &str,
        sink: &dyn ProgressSink,
    ) -> Vec<String> {
        sink.emit(ProgressEvent::new(
            "pdf_fallback_author",
            format!("PDF fallback: {author_name}"),
            format!("Searching paper PDFs for {author_name}"),
            ProgressStatus::InProgress,
        ));

        let urls =
            pdf_fallback::candidate_pdf_urls(&self.fetcher, profile_html, &self.base_url).await;
        let emails = pdf_fallback::collect_emails(&self.fetcher, &self.matcher, &urls).await;

        sink.emit(ProgressEvent::new(
            "pdf_fallback_complete",
            "PDF fallback complete",
            format!("{} distinct address(es) found in PDFs", emails.len()),
            ProgressStatus::Completed,
        ));

        emails
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NullSink;

    fn config(base_url: &str) -> Config {
        let mut config = Config::default();
        config.harvest.base_url = base_url.to_string();
        config
    }

    #[tokio::test]
    async fn test_unlinked_author_needs_no_network() {
        let resolver = ContactResolver::connect(&config("https://scholar.google.com"))
            .await
            .unwrap();
        let result = resolver
            .resolve_author(&AuthorRef::unlinked("J Doe"), &NullSink)
            .await
            .unwrap();
        assert_eq!(result.source, ContactSource::NoScholarLink);
        assert!(result.email.is_none());
        assert!(result.homepage.is_none());
    }

    #[tokio::test]
    async fn test_homepage_email_resolution() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/citations")
            .match_query(mockito::Matcher::Any)
            .with_body(format!(
                r#"<div id="gsc_prf_ivh"><a href="{}/site/jdoe.github.io">Homepage</a></div>"#,
                server.url()
            ))
            .create_async()
            .await;
        server
            .mock("GET", "/site/jdoe.github.io")
            .with_body(r#"<a href="mailto:jdoe@cs.uni.edu">mail</a>"#)
            .create_async()
            .await;

        let resolver = ContactResolver::connect(&config(&server.url())).await.unwrap();
        let author = AuthorRef::new("J Doe", format!("{}/citations?user=abc", server.url()));
        let result = resolver.resolve_author(&author, &NullSink).await.unwrap();

        assert_eq!(result.source, ContactSource::PersonalWebsite);
        assert_eq!(result.email.as_deref(), Some("jdoe@cs.uni.edu"));
        assert!(result.homepage.is_some());
    }

    #[tokio::test]
    async fn test_no_homepage_and_empty_pdfs() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/citations")
            .match_query(mockito::Matcher::Any)
            .with_body("<html><body>no homepage, no papers</body></html>")
            .create_async()
            .await;

        let resolver = ContactResolver::connect(&config(&server.url())).await.unwrap();
        let author = AuthorRef::new("J Doe", format!("{}/citations?user=abc", server.url()));
        let result = resolver.resolve_author(&author, &NullSink).await.unwrap();

        assert_eq!(result.source, ContactSource::NoHomepageAndNotInPdf);
        assert!(result.email.is_none());
    }

    #[tokio::test]
    async fn test_batch_contains_per_author_failures() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/citations")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let resolver = ContactResolver::connect(&config(&server.url())).await.unwrap();
        let authors = vec![
            AuthorRef::new("Failing Author", format!("{}/citations?user=x", server.url())),
            AuthorRef::unlinked("Unlinked Author"),
        ];

        let results = resolver.resolve_batch(&authors, &NullSink).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source, ContactSource::Error);
        assert_eq!(results[1].source, ContactSource::NoScholarLink);
    }
}
