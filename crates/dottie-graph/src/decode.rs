//! Conversion from raw store rows into typed reference records.
//!
//! Every field is validated and coerced exactly once here; the rest of the system only
//! ever sees the typed records.

use dottie_core::{Cause, Condition, EducationalContent, NormalRange, Record, Result, TriageError};

pub trait FromRecord: Sized {
    fn from_record(record: &Record) -> Result<Self>;
}

impl FromRecord for NormalRange {
    fn from_record(record: &Record) -> Result<Self> {
        let range = NormalRange {
            name: record.str_field("name")?,
            min: record.i64_field("min")?,
            max: record.i64_field("max")?,
            unit: record.opt_str_field("unit")?.unwrap_or_default(),
        };
        if range.min > range.max {
            return Err(TriageError::Parse(format!(
                "normal range '{}' has min {} above max {}",
                range.name, range.min, range.max
            )));
        }
        Ok(range)
    }
}

impl FromRecord for Condition {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(Condition {
            name: record.str_field("name")?,
            definition: record.opt_str_field("definition")?.unwrap_or_default(),
            severity: record.str_field("severity")?,
            requires_attention: record.bool_field("requiresAttention")?,
            action: record.opt_str_field("action")?,
        })
    }
}

impl FromRecord for Cause {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(Cause {
            name: record.str_field("name")?,
        })
    }
}

impl FromRecord for EducationalContent {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(EducationalContent {
            content_type: record.str_field("content_type")?,
            url: record.str_field("url")?,
            title: record.opt_str_field("title")?.unwrap_or_default(),
            source: record.opt_str_field("source")?.unwrap_or_default(),
        })
    }
}

/// Decode every row, failing on the first one that does not fit.
pub fn decode_all<T: FromRecord>(records: &[Record]) -> Result<Vec<T>> {
    records.iter().map(T::from_record).collect()
}
