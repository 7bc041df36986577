//! Store trait and error types

use crate::store::PostingRecord;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{path} has an unrecognised header: {found}")]
    SchemaMismatch { path: String, found: String },

    #[error(transparent)]
    Migration(#[from] StoreMigrationError),
}

/// An old-layout file could not be rewritten to the current columns
///
/// Never fatal: the store keeps using the file in its old layout.
#[derive(Debug, Error)]
#[error("failed to migrate {path} from {from_width} to {to_width} columns: {reason}")]
pub struct StoreMigrationError {
    pub path: String,
    pub from_width: usize,
    pub to_width: usize,
    pub reason: String,
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Append-only record of processed postings, keyed by job identifier
///
/// Membership is answered from memory; the backing file is only written.
pub trait DedupStore {
    /// Returns true if a row for this identifier has been written
    fn contains(&self, job_id: &str) -> bool;

    /// Durably appends one row and marks its identifier as known
    fn append(&mut self, record: &PostingRecord) -> StoreResult<()>;

    /// Number of known identifiers
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
