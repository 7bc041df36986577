//! Store column layout and header checks
//!
//! The store's first line is always the exact column list below. Files
//! written before the start-timing columns existed carry only the first
//! [`LEGACY_WIDTH`] names and are migrated on open.

use csv::StringRecord;

/// Current columns, in file order
pub static COLUMNS: [&str; 8] = [
    "crawlTime",
    "jobID",
    "durationSpecified",
    "durationMonths",
    "renewalMentioned",
    "startSpecified",
    "startIso",
    "startDescriptor",
];

/// Width of the original five-column layout
pub const LEGACY_WIDTH: usize = 5;

/// Position of the dedup key
pub const JOB_ID_INDEX: usize = 1;

/// Schema version written by this build
pub fn schema_version() -> u32 {
    2
}

/// Outcome of comparing a file header against [`COLUMNS`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderCheck {
    /// Header equals the current column list
    Current,

    /// Header is a strict prefix of the current list that still includes
    /// the dedup key; the file can be migrated
    Legacy { width: usize },

    /// Anything else
    Incompatible,
}

/// Classifies a header row
pub fn check_header(header: &StringRecord) -> HeaderCheck {
    let width = header.len();

    if width == 0 || width > COLUMNS.len() {
        return HeaderCheck::Incompatible;
    }

    let is_prefix = header.iter().zip(COLUMNS.iter()).all(|(a, b)| a == *b);
    if !is_prefix {
        return HeaderCheck::Incompatible;
    }

    if width == COLUMNS.len() {
        HeaderCheck::Current
    } else if width > JOB_ID_INDEX {
        HeaderCheck::Legacy { width }
    } else {
        HeaderCheck::Incompatible
    }
}

/// The current header as a record
pub fn header_record() -> StringRecord {
    StringRecord::from(COLUMNS.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(columns: &[&str]) -> StringRecord {
        StringRecord::from(columns.to_vec())
    }

    #[test]
    fn test_current_header() {
        assert_eq!(check_header(&header_record()), HeaderCheck::Current);
    }

    #[test]
    fn test_legacy_header() {
        let legacy = header(&COLUMNS[..LEGACY_WIDTH]);
        assert_eq!(
            check_header(&legacy),
            HeaderCheck::Legacy {
                width: LEGACY_WIDTH
            }
        );
    }

    #[test]
    fn test_incompatible_headers() {
        assert_eq!(check_header(&header(&[])), HeaderCheck::Incompatible);
        assert_eq!(
            check_header(&header(&["crawlTime"])),
            HeaderCheck::Incompatible
        );
        assert_eq!(
            check_header(&header(&["jobID", "crawlTime"])),
            HeaderCheck::Incompatible
        );

        let mut wide = COLUMNS.to_vec();
        wide.push("extra");
        assert_eq!(check_header(&header(&wide)), HeaderCheck::Incompatible);
    }

    #[test]
    fn test_header_names_are_case_sensitive() {
        let mut columns = COLUMNS.to_vec();
        columns[1] = "jobId";
        assert_eq!(check_header(&header(&columns)), HeaderCheck::Incompatible);
    }
}
