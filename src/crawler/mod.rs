//! Crawler module for listing pages and enriching new postings
//!
//! This module contains the core crawling logic, including:
//! - Listing and detail fetchers over the shared retrying client
//! - Markup-to-text normalization
//! - The page loop and its stop conditions

mod detail;
mod listing;
mod normalize;
mod orchestrator;

pub use detail::DetailClient;
pub use listing::{Advertiser, ListingClient, ListingResponse, PostingSummary};
pub use normalize::normalize;
pub use orchestrator::Orchestrator;

use crate::config::{Config, Credential};
use crate::http::NetworkError;
use crate::state::CrawlReport;
use crate::store::CsvStore;
use crate::HarvestError;
use thiserror::Error;

/// Errors from the listing and detail fetchers
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("could not decode {what} response: {source}")]
    Decode {
        what: &'static str,
        source: serde_json::Error,
    },

    #[error("detail query for posting {job_id} failed: {messages}")]
    GraphQl { job_id: String, messages: String },

    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Runs a complete crawl against the configured CSV store
///
/// Opening the store (including any migration) happens before the first
/// request; an unreadable or incompatible store is the only error returned.
///
/// # Returns
///
/// * `Ok(CrawlReport)` - the run finished; `processed` is the new-row count
/// * `Err(HarvestError)` - the store or a client could not be set up
pub async fn run_crawl(config: &Config, credential: &Credential) -> Result<CrawlReport, HarvestError> {
    let store = CsvStore::open(&config.output.store_path)?;
    if store.is_legacy_layout() {
        tracing::warn!(
            "Store {} is still in the legacy layout; new rows carry only the legacy columns",
            store.path().display()
        );
    }

    let mut orchestrator = Orchestrator::new(config, credential, store)?;
    Ok(orchestrator.run().await)
}
