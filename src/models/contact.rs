//! Contact resolution outcomes and progress events.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// Why an email is present or absent for one author.
///
/// Exactly one tag is attached to every [`ContactResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactSource {
    /// Email found on the author's personal website
    PersonalWebsite,
    /// Email found on the first page of one of the author's papers
    PdfFallback,
    /// The author reference carried no profile URL
    NoScholarLink,
    /// A homepage existed but neither it nor the PDFs yielded an email
    NotFoundInPdf,
    /// No homepage, and the PDF fallback came up empty
    NoHomepageAndNotInPdf,
    /// Resolution failed with an error for this author
    Error,
}

impl ContactSource {
    /// Stable wire/display tag for this source
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactSource::PersonalWebsite => "personal_website",
            ContactSource::PdfFallback => "pdf_fallback",
            ContactSource::NoScholarLink => "no_scholar_link",
            ContactSource::NotFoundInPdf => "not_found_in_pdf",
            ContactSource::NoHomepageAndNotInPdf => "no_homepage_and_not_in_pdf",
            ContactSource::Error => "error",
        }
    }
}

impl std::fmt::Display for ContactSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved (or unresolved) email outcome for one author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactResult {
    /// Author display name
    pub name: String,

    /// Primary email, when one was found
    pub email: Option<String>,

    /// Why `email` is present or absent
    pub source: ContactSource,

    /// Accepted homepage URL, when one was discovered
    pub homepage: Option<String>,
}

impl ContactResult {
    /// An outcome without an email, explained by `source`
    pub fn empty(name: impl Into<String>, source: ContactSource) -> Self {
        Self {
            name: name.into(),
            email: None,
            source,
            homepage: None,
        }
    }

    /// Attach the discovered homepage
    pub fn homepage(mut self, homepage: impl Into<String>) -> Self {
        self.homepage = Some(homepage.into());
        self
    }
}

/// Lifecycle status of a progress step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    InProgress,
    Completed,
    Failed,
}

/// Fire-and-forget progress notification emitted by long-running phases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Machine-readable step identifier (e.g. "extract_personal_homepage")
    pub step: String,

    /// Short human-readable title
    pub title: String,

    /// Longer description of what is happening
    pub description: String,

    /// Step status
    pub status: ProgressStatus,

    /// Optional structured result payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl ProgressEvent {
    /// Create an event with the given step/title/description/status
    pub fn new(
        step: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        status: ProgressStatus,
    ) -> Self {
        Self {
            step: step.into(),
            title: title.into(),
            description: description.into(),
            status,
            result: None,
        }
    }

    /// Attach a structured result payload
    pub fn result(mut self, result: serde_json::Value) -> Self {
        self.result = Some(result);
        self
    }
}

/// Destination for progress events.
///
/// Delivery is fire-and-forget: implementations must never block or fail the
/// pipeline.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Sink that discards all events.
#[derive(Debug, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Sink that forwards events over an unbounded channel.
///
/// A closed receiver is ignored; progress is best-effort.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_source_tags() {
        assert_eq!(ContactSource::PersonalWebsite.as_str(), "personal_website");
        assert_eq!(
            ContactSource::NoHomepageAndNotInPdf.as_str(),
            "no_homepage_and_not_in_pdf"
        );
    }

    #[test]
    fn test_contact_source_serde_tag() {
        let json = serde_json::to_string(&ContactSource::PdfFallback).unwrap();
        assert_eq!(json, "\"pdf_fallback\"");
    }

    #[test]
    fn test_channel_sink_delivers() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = ChannelSink::new(tx);
        sink.emit(ProgressEvent::new(
            "step",
            "Title",
            "Description",
            ProgressStatus::InProgress,
        ));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.step, "step");
        assert_eq!(event.status, ProgressStatus::InProgress);
    }

    #[test]
    fn test_channel_sink_ignores_closed_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        let sink = ChannelSink::new(tx);
        // Must not panic
        sink.emit(ProgressEvent::new(
            "step",
            "Title",
            "Description",
            ProgressStatus::Completed,
        ));
    }
}
