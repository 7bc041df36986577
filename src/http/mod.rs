//! Outbound HTTP with bounded retries
//!
//! Every network-facing component goes through [`RequestClient`], which
//! composes a single-attempt request with the [`with_retry`] combinator.

mod client;
mod retry;

pub use client::{build_http_client, HttpResponse, RequestClient};
pub use retry::{with_retry, RetryPolicy};

use thiserror::Error;

/// A request that still failed after the retry budget was spent
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("{url} returned HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
}
