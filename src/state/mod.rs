//! Crawl progress tracking
//!
//! - `CrawlPhase`: where the page loop is
//! - `StopReason`: why it ended
//! - `CrawlReport`: what a run did, built from `PostingOutcome`s

mod phase;
mod report;

pub use phase::{CrawlPhase, StopReason};
pub use report::{CrawlReport, PostingOutcome};
