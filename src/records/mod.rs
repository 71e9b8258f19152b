pub mod csv;
pub mod json;
pub mod normalize;
pub mod project;

pub use self::csv::{parse, parse_with, split_row, CsvOptions};
pub use self::json::parse_json;
pub use normalize::{normalize, MISSING_PLACEHOLDER};
pub use project::ProjectRecord;

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A single normalized cell.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    /// Empty cell, padded cell, or the literal `N/A`.
    Missing,
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    /// JavaScript-style truthiness: missing, zero and empty text are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Number(n) => *n != 0.0,
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::Missing => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Missing => f.write_str(MISSING_PLACEHOLDER),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Number(n) => serializer.serialize_f64(*n),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Missing => serializer.serialize_str(MISSING_PLACEHOLDER),
        }
    }
}

/// One parsed data row keyed by header name.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// A data row whose cell count differed from the header width.
/// Only excess cells are reported; short rows are padded silently.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RowWidthMismatch {
    /// 1-based line number in the source text.
    pub line: usize,
    pub expected: usize,
    pub found: usize,
}

impl fmt::Display for RowWidthMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}: expected {} cells, found {}; extra cells dropped",
            self.line, self.expected, self.found
        )
    }
}

/// Headers, records and non-fatal warnings from one parse.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RowWidthMismatch>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}
