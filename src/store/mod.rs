//! Store module for persisting processed postings
//!
//! This module handles the append-only CSV table, including:
//! - Header validation and in-place migration of older layouts
//! - Loading known identifiers for dedup
//! - Durable, one-row-at-a-time appends

mod csv_store;
pub mod schema;
mod traits;

pub use csv_store::{CsvStore, StoredRow};
pub use traits::{DedupStore, StoreError, StoreMigrationError, StoreResult};

use crate::extract::ExtractedSignals;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Serialize, Serializer};

/// Descriptor written on sentinel rows for postings with no description
pub const NO_DESCRIPTION: &str = "no description";

/// One processed posting, as written to the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingRecord {
    #[serde(serialize_with = "serialize_crawl_time")]
    pub crawl_time: DateTime<Utc>,
    #[serde(rename = "jobID")]
    pub job_id: String,
    pub duration_specified: bool,
    pub duration_months: u32,
    pub renewal_mentioned: bool,
    pub start_specified: bool,
    pub start_iso: String,
    pub start_descriptor: String,
}

impl PostingRecord {
    /// Builds a row from extracted signals, stamped with `crawl_time`
    pub fn new(
        job_id: impl Into<String>,
        crawl_time: DateTime<Utc>,
        signals: ExtractedSignals,
    ) -> Self {
        Self {
            crawl_time: crawl_time.trunc_subsecs(0),
            job_id: job_id.into(),
            duration_specified: signals.duration_specified,
            duration_months: signals.duration_months,
            renewal_mentioned: signals.renewal_mentioned,
            start_specified: signals.start_specified,
            start_iso: signals.start_iso,
            start_descriptor: signals.start_descriptor,
        }
    }

    /// Sentinel row for a posting whose description came back empty
    pub fn empty_description(job_id: impl Into<String>, crawl_time: DateTime<Utc>) -> Self {
        Self {
            crawl_time: crawl_time.trunc_subsecs(0),
            job_id: job_id.into(),
            duration_specified: false,
            duration_months: 0,
            renewal_mentioned: false,
            start_specified: false,
            start_iso: String::new(),
            start_descriptor: NO_DESCRIPTION.to_string(),
        }
    }

    /// Field values in column order, as they appear in the file
    pub fn fields(&self) -> [String; 8] {
        [
            format_crawl_time(&self.crawl_time),
            self.job_id.clone(),
            self.duration_specified.to_string(),
            self.duration_months.to_string(),
            self.renewal_mentioned.to_string(),
            self.start_specified.to_string(),
            self.start_iso.clone(),
            self.start_descriptor.clone(),
        ]
    }
}

/// ISO-8601 UTC with a `Z` suffix and whole seconds
pub fn format_crawl_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn serialize_crawl_time<S: Serializer>(
    time: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_crawl_time(time))
}
