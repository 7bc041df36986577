//! Output module for run reports and store statistics
//!
//! This module handles:
//! - Printing the end-of-run report
//! - Summarising the store for the `--stats` mode

pub mod stats;

pub use stats::{load_statistics, print_statistics, StoreStatistics};

use crate::state::CrawlReport;

/// Prints a finished run's report to stdout
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");
    println!("New postings processed: {}", report.processed);
    println!("Empty descriptions: {}", report.skipped_empty);
    println!("Failed postings: {}", report.failed);
    println!("Listing pages fetched: {}", report.pages_fetched);
    if let Some(reason) = &report.stop_reason {
        println!("Stopped: {}", reason);
    }
}
