//! Per-posting outcomes and the run summary

use crate::state::StopReason;

/// What happened to one new posting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingOutcome {
    /// Extracted and appended to the store
    Recorded,

    /// Description was empty; nothing stored, so the next run retries it
    SkippedEmpty,

    /// Description was empty; a sentinel row was stored
    MarkedEmpty,

    /// Detail, extraction or append failed
    Failed,
}

/// Totals for one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Newly processed postings; the run's headline count
    pub processed: usize,
    pub skipped_empty: usize,
    pub failed: usize,
    pub pages_fetched: u32,
    pub stop_reason: Option<StopReason>,
}

impl CrawlReport {
    pub fn record(&mut self, outcome: PostingOutcome) {
        match outcome {
            PostingOutcome::Recorded => self.processed += 1,
            PostingOutcome::SkippedEmpty | PostingOutcome::MarkedEmpty => {
                self.skipped_empty += 1
            }
            PostingOutcome::Failed => self.failed += 1,
        }
    }

    /// Postings that reached the per-posting pipeline
    pub fn attempted(&self) -> usize {
        self.processed + self.skipped_empty + self.failed
    }
}
