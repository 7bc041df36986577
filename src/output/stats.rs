//! Statistics over the posting store
//!
//! This module summarises what the store holds for the `--stats` mode.

use crate::store::{CsvStore, StoreResult, StoredRow, NO_DESCRIPTION};
use std::path::Path;

/// Store statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreStatistics {
    /// Total number of rows
    pub total_rows: usize,

    /// Rows stating a concrete contract length
    pub duration_specified: usize,

    /// Rows mentioning renewal or extension
    pub renewal_mentioned: usize,

    /// Rows giving any start timing
    pub start_specified: usize,

    /// Rows carrying a concrete start date
    pub start_dated: usize,

    /// Sentinel rows for postings without a description
    pub empty_descriptions: usize,

    /// Rows written before the start-timing columns existed
    pub legacy_rows: usize,

    /// Mean months over rows with a specified duration
    pub mean_duration_months: Option<f64>,

    /// Earliest and latest crawl timestamps, as stored
    pub first_crawl: Option<String>,
    pub last_crawl: Option<String>,
}

impl StoreStatistics {
    pub fn from_rows(rows: &[StoredRow]) -> Self {
        let mut stats = Self {
            total_rows: rows.len(),
            ..Self::default()
        };
        let mut months_total: u64 = 0;

        for row in rows {
            if row.duration_specified == Some(true) {
                stats.duration_specified += 1;
                months_total += u64::from(row.duration_months.unwrap_or(0));
            }
            if row.renewal_mentioned == Some(true) {
                stats.renewal_mentioned += 1;
            }
            match row.start_specified {
                Some(true) => stats.start_specified += 1,
                Some(false) => {}
                None => stats.legacy_rows += 1,
            }
            if row.start_iso.as_deref().map_or(false, |iso| !iso.is_empty()) {
                stats.start_dated += 1;
            }
            if row.start_descriptor.as_deref() == Some(NO_DESCRIPTION) {
                stats.empty_descriptions += 1;
            }
        }

        if stats.duration_specified > 0 {
            stats.mean_duration_months = Some(months_total as f64 / stats.duration_specified as f64);
        }

        // RFC 3339 UTC timestamps in one format sort lexically
        stats.first_crawl = rows.iter().map(|r| r.crawl_time.clone()).min();
        stats.last_crawl = rows.iter().map(|r| r.crawl_time.clone()).max();

        stats
    }
}

/// Loads statistics from the store file without modifying it
///
/// Returns `None` when there is no store at `path` yet.
pub fn load_statistics(path: &Path) -> StoreResult<Option<StoreStatistics>> {
    let rows = CsvStore::peek_rows(path)?;
    Ok(rows.map(|rows| StoreStatistics::from_rows(&rows)))
}

fn percentage(count: usize, total: usize) -> f64 {
    if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    println!("Overview:");
    println!("  Total rows: {}", stats.total_rows);
    if let (Some(first), Some(last)) = (&stats.first_crawl, &stats.last_crawl) {
        println!("  Crawled: {} .. {}", first, last);
    }
    println!();

    let total = stats.total_rows;
    println!("Signals:");
    println!(
        "  Duration specified: {} ({:.1}%)",
        stats.duration_specified,
        percentage(stats.duration_specified, total)
    );
    println!(
        "  Renewal mentioned: {} ({:.1}%)",
        stats.renewal_mentioned,
        percentage(stats.renewal_mentioned, total)
    );
    println!(
        "  Start specified: {} ({:.1}%)",
        stats.start_specified,
        percentage(stats.start_specified, total)
    );
    println!("  Start dated: {}", stats.start_dated);
    match stats.mean_duration_months {
        Some(mean) => println!("  Mean duration: {:.1} months", mean),
        None => println!("  Mean duration: n/a"),
    }
    println!();

    if stats.empty_descriptions > 0 || stats.legacy_rows > 0 {
        println!("Other:");
        println!("  Empty descriptions: {}", stats.empty_descriptions);
        println!("  Rows without start columns: {}", stats.legacy_rows);
    }
}
