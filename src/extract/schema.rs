//! Output schema for contract-signal extraction
//!
//! The same field list is sent to the endpoint as a response schema and
//! enforced again locally when the candidate text comes back.

use crate::store::schema::COLUMNS;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

/// Index of the first extracted column in the store layout
const FIRST_SIGNAL_COLUMN: usize = 2;

/// Signals extracted from one posting description
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExtractedSignals {
    pub duration_specified: bool,
    pub duration_months: u32,
    pub renewal_mentioned: bool,
    pub start_specified: bool,
    pub start_iso: String,
    pub start_descriptor: String,
}

impl ExtractedSignals {
    /// Parses and validates candidate text
    ///
    /// Returns a human-readable reason on rejection.
    pub fn from_candidate(text: &str) -> Result<Self, String> {
        let signals: Self = serde_json::from_str(text.trim()).map_err(|e| e.to_string())?;
        signals.validated()
    }

    /// Checks what the declared schema cannot express
    ///
    /// Only a malformed `startIso` is rejected. Flags that disagree with the
    /// other fields are kept as returned and logged.
    fn validated(self) -> Result<Self, String> {
        if !self.start_iso.is_empty() {
            NaiveDate::parse_from_str(&self.start_iso, "%Y-%m-%d").map_err(|e| {
                format!("startIso {:?} is not a YYYY-MM-DD date: {}", self.start_iso, e)
            })?;
            if !self.start_specified {
                tracing::warn!(
                    "Extraction gave startIso {} with startSpecified false",
                    self.start_iso
                );
            }
        }

        if self.start_specified && self.start_descriptor.trim().is_empty() {
            tracing::warn!("Extraction gave an empty startDescriptor with startSpecified true");
        }

        Ok(self)
    }
}

/// Names of the extracted fields, in store column order
pub fn signal_fields() -> &'static [&'static str] {
    &COLUMNS[FIRST_SIGNAL_COLUMN..]
}

/// Response schema sent with every extraction request
///
/// All fields are required and their order is pinned.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "durationSpecified": {
                "type": "BOOLEAN",
                "description": "True if the posting states a concrete contract length or end date."
            },
            "durationMonths": {
                "type": "INTEGER",
                "description": "Contract length in whole months, 0 if not stated."
            },
            "renewalMentioned": {
                "type": "BOOLEAN",
                "description": "True if extension, renewal or possible permanency is mentioned."
            },
            "startSpecified": {
                "type": "BOOLEAN",
                "description": "True if any start timing is given, including 'ASAP' or 'immediate'."
            },
            "startIso": {
                "type": "STRING",
                "description": "YYYY-MM-DD of the first day the start timing implies, or empty."
            },
            "startDescriptor": {
                "type": "STRING",
                "description": "Short phrase describing the start timing, or 'not specified'."
            }
        },
        "required": signal_fields(),
        "propertyOrdering": signal_fields(),
    })
}
