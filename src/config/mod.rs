//! Configuration module for Tidemark
//!
//! This module handles loading, parsing, and validating the TOML run
//! configuration, and reading the extraction credential from the environment.
//!
//! # Example
//!
//! ```no_run
//! use tidemark::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("tidemark.toml")).unwrap();
//! println!("Crawl will stop after {} pages", config.crawl.max_pages);
//! ```

mod credential;
mod parser;
mod types;
mod validation;

pub use credential::Credential;
pub use types::{
    Config, CrawlConfig, DetailConfig, ExtractionConfig, HttpConfig, OutputConfig, RetryConfig,
    SearchConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, MAX_PAGE_SIZE};
