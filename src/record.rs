//! Records and the builder that turns raw field tuples into them.

use serde::Serialize;

use crate::error::MalformedReason;

/// Number of fields every input row must carry: identifier and value.
pub const FIELDS_PER_RECORD: usize = 2;

const ID_IDX: usize = 0;
const VALUE_IDX: usize = 1;

/// One row as produced by the input layer, before any typing.
pub type RawFields = Vec<String>;

/// Typed unit of work: identifier, value and the validation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub id: u32,
    pub value: String,
    pub validated: bool,
    pub valid: bool,
}

impl Record {
    pub fn new(id: u32, value: impl Into<String>) -> Self {
        Self {
            id,
            value: value.into(),
            validated: false,
            valid: false,
        }
    }

    /// Record the verdict. Called exactly once, by the worker that validated it.
    pub fn mark_validated(&mut self, valid: bool) {
        debug_assert!(!self.validated, "record {} validated twice", self.id);
        self.validated = true;
        self.valid = valid;
    }
}

/// A row that could not be turned into a record, kept for the malformed group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    /// 1-based position among data rows (header excluded).
    pub row: u64,
    pub fields: RawFields,
    pub reason: MalformedReason,
}

/// Build a record from exactly two fields: an unsigned 32-bit identifier and a value.
pub fn build_record(fields: RawFields) -> Result<Record, MalformedReason> {
    if fields.len() != FIELDS_PER_RECORD {
        return Err(MalformedReason::FieldCount {
            expected: FIELDS_PER_RECORD,
            found: fields.len(),
        });
    }

    let id = parse_identifier(&fields[ID_IDX])?;
    let value = fields.into_iter().nth(VALUE_IDX).unwrap_or_default();

    Ok(Record::new(id, value))
}

fn parse_identifier(text: &str) -> Result<u32, MalformedReason> {
    let trimmed = text.trim_matches(|c: char| c.is_ascii_whitespace());
    // u32::from_str accepts a leading '+'; identifiers are plain digits only
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MalformedReason::BadIdentifier {
            text: text.to_string(),
        });
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| MalformedReason::BadIdentifier {
            text: text.to_string(),
        })
}
