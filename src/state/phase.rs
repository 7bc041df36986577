//! Crawl phases and stop reasons
//!
//! The orchestrator walks `Paging → FetchingListing → FilteringNew →
//! ProcessingPostings → Paging` until one of the [`StopReason`]s applies.
use std::fmt;

/// Where the orchestrator is in its page loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Between pages, including before the first one
    Paging,

    /// Waiting on the listing endpoint
    FetchingListing,

    /// Dropping summaries the store already holds
    FilteringNew,

    /// Running the per-posting pipeline
    ProcessingPostings,

    /// No further pages will be requested
    Stopped,
}

impl CrawlPhase {
    /// Returns true once the loop has ended
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paging => "paging",
            Self::FetchingListing => "fetching_listing",
            Self::FilteringNew => "filtering_new",
            Self::ProcessingPostings => "processing_postings",
            Self::Stopped => "stopped",
        }
    }

    /// Whether `next` may follow this phase
    pub fn can_advance_to(&self, next: CrawlPhase) -> bool {
        use CrawlPhase::*;
        matches!(
            (*self, next),
            (Paging, FetchingListing)
                | (FetchingListing, FilteringNew)
                | (FetchingListing, Stopped)
                | (FilteringNew, ProcessingPostings)
                | (FilteringNew, Stopped)
                | (ProcessingPostings, Paging)
                | (ProcessingPostings, Stopped)
        )
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why the page loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The listing returned no summaries
    Exhausted { page: u32 },

    /// Every summary on the page was already stored. Relies on the listing
    /// being sorted newest first.
    FrontierReached { page: u32 },

    /// The configured page quota was used up
    MaxPages { page: u32 },

    /// The listing request still failed after retries
    ListingUnavailable { page: u32 },
}

impl StopReason {
    /// Page on which the loop stopped
    pub fn page(&self) -> u32 {
        match *self {
            Self::Exhausted { page }
            | Self::FrontierReached { page }
            | Self::MaxPages { page }
            | Self::ListingUnavailable { page } => page,
        }
    }

    /// Normal stops are upstream exhaustion, the frontier and the quota
    pub fn is_normal(&self) -> bool {
        !matches!(self, Self::ListingUnavailable { .. })
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { page } => write!(f, "listing exhausted at page {}", page),
            Self::FrontierReached { page } => {
                write!(f, "no new postings on page {}", page)
            }
            Self::MaxPages { page } => write!(f, "page limit reached at page {}", page),
            Self::ListingUnavailable { page } => {
                write!(f, "listing unavailable at page {}", page)
            }
        }
    }
}
