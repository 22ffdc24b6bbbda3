//! Resilient Google Scholar harvesting and author contact resolution.
//!
//! Two pipelines share one HTTP layer:
//!
//! - [`harvest::Harvester`] walks paginated search results, paces its
//!   requests, classifies failures, and escalates bot challenges to a
//!   pluggable handler.
//! - [`resolve::ContactResolver`] turns author profile links into
//!   contact emails via homepage discovery, with a PDF fallback that
//!   mines the first pages of the author's papers.

pub mod config;
pub mod extract;
pub mod fetch;
pub mod harvest;
pub mod models;
pub mod resolve;
pub mod ui;

pub use config::Config;
pub use harvest::{HarvestError, Harvester};
pub use models::{AuthorRef, ContactResult, ContactSource, Record, SearchQuery};
pub use resolve::ContactResolver;
