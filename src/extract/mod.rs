//! Content extraction: email address matching and PDF text recovery.

pub mod emails;
pub mod pdf;

pub use emails::EmailMatcher;
pub use pdf::first_page_text;
