//! Structured extraction of contract signals
//!
//! Normalized posting text goes in; a validated [`ExtractedSignals`] comes
//! out, or an [`ExtractionError`] that names what the endpoint got wrong.

mod client;
mod schema;

pub use client::{build_prompt, Extractor, GenerateRequest, GenerateResponse};
pub use schema::{response_schema, signal_fields, ExtractedSignals};

use crate::http::NetworkError;
use thiserror::Error;

/// Why extraction failed for a posting
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction request failed: {0}")]
    Network(#[from] NetworkError),

    #[error("extraction returned no candidate text{}", feedback_suffix(.feedback))]
    NoCandidate { feedback: Option<String> },

    #[error("extraction output rejected: {reason}{}", feedback_suffix(.feedback))]
    InvalidOutput {
        reason: String,
        feedback: Option<String>,
    },

    #[error("invalid extraction endpoint: {0}")]
    Endpoint(String),
}

fn feedback_suffix(feedback: &Option<String>) -> String {
    match feedback {
        Some(feedback) => format!(" (upstream feedback: {})", feedback),
        None => String::new(),
    }
}
