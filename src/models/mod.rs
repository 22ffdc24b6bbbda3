//! Core data structures shared across the pipeline.

mod contact;
mod record;

pub use contact::{
    ChannelSink, ContactResult, ContactSource, NullSink, ProgressEvent, ProgressSink,
    ProgressStatus,
};
pub use record::{normalize_title, AuthorRef, Record, SearchQuery};
