use crate::{Result, TriageError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

/// Named parameters bound into a graph query.
pub type QueryParams = Map<String, JsonValue>;

/// One row returned by the graph store: declared field name to store-native scalar.
///
/// Stores are free to hand back numbers and booleans as strings, so the typed getters
/// coerce where the value is unambiguous and fail with [`TriageError::Parse`] otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(HashMap<String, JsonValue>);

impl Record {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    fn require(&self, field: &str) -> Result<&JsonValue> {
        self.get(field)
            .ok_or_else(|| TriageError::Parse(format!("missing field '{}'", field)))
    }

    pub fn str_field(&self, field: &str) -> Result<String> {
        match self.require(field)? {
            JsonValue::String(s) => Ok(s.clone()),
            JsonValue::Number(n) => Ok(n.to_string()),
            JsonValue::Bool(b) => Ok(b.to_string()),
            other => Err(TriageError::Parse(format!(
                "field '{}' is not a scalar: {}",
                field, other
            ))),
        }
    }

    /// Like [`Record::str_field`] but absent or null values are `None`.
    pub fn opt_str_field(&self, field: &str) -> Result<Option<String>> {
        match self.get(field) {
            None => Ok(None),
            Some(_) => self.str_field(field).map(Some),
        }
    }

    /// Integer field. Accepts integral numbers and strings holding an integer.
    pub fn i64_field(&self, field: &str) -> Result<i64> {
        let value = self.require(field)?;
        let parsed = match value {
            JsonValue::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            JsonValue::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| {
            TriageError::Parse(format!(
                "field '{}' is not an integer: {}",
                field, value
            ))
        })
    }

    /// Boolean field. Strings follow ParseBool rules.
    pub fn bool_field(&self, field: &str) -> Result<bool> {
        let value = self.require(field)?;
        match value {
            JsonValue::Bool(b) => Ok(*b),
            JsonValue::String(s) => parse_bool(s).ok_or_else(|| {
                TriageError::Parse(format!("field '{}' is not a boolean: {:?}", field, s))
            }),
            JsonValue::Number(n) if n.as_i64() == Some(1) => Ok(true),
            JsonValue::Number(n) if n.as_i64() == Some(0) => Ok(false),
            other => Err(TriageError::Parse(format!(
                "field '{}' is not a boolean: {}",
                field, other
            ))),
        }
    }
}

impl From<HashMap<String, JsonValue>> for Record {
    fn from(fields: HashMap<String, JsonValue>) -> Self {
        Self(fields)
    }
}

/// `1 t T TRUE true True` / `0 f F FALSE false False`; nothing else.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
