//! Tidemark: an incremental job-posting harvester
//!
//! This crate pages through a newest-first job search listing, stops at the
//! frontier of postings it has already recorded, and for every new posting
//! fetches the full description, extracts contract signals through a
//! schema-constrained generative endpoint and appends one row to a CSV store.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod http;
pub mod output;
pub mod state;
pub mod store;

use thiserror::Error;

/// Main error type for Tidemark operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(#[from] http::NetworkError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] extract::ExtractionError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
///
/// These are fatal: a run aborts on any of them before the first request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Credential environment variable {var} is missing or blank")]
    MissingCredential { var: String },
}

/// Result type alias for Tidemark operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use config::{Config, Credential};
pub use crawler::{run_crawl, Orchestrator};
pub use state::{CrawlReport, StopReason};
pub use store::{CsvStore, DedupStore, PostingRecord};
