use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

pub type Result<T, E = CountmeError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum CountmeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),
    #[error("malformed timestamp: {0:?}")]
    MalformedTimestamp(String),
    #[error("malformed value for field '{field}': {value:?} ({reason})")]
    MalformedRecordField {
        field: String,
        value: String,
        reason: &'static str,
    },
    #[error("unknown format '{0}'")]
    UnknownFormat(String),
    #[error("no field names found")]
    SchemaMissing,
    #[error("field mismatch: expected {expected:?}, got {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("'{item}' has no time field '{field}'")]
    UnknownTimeField { item: &'static str, field: String },
    #[error("format '{format}' cannot use a {output} output")]
    UnsupportedOutput {
        format: &'static str,
        output: &'static str,
    },
    #[error("format '{format}' cannot read from a {input} input")]
    UnsupportedInput {
        format: &'static str,
        input: &'static str,
    },
}

impl CountmeError {
    pub(crate) fn malformed(field: &str, value: &str, reason: &'static str) -> Self {
        CountmeError::MalformedRecordField {
            field: field.to_string(),
            value: value.to_string(),
            reason,
        }
    }
}

/// Storage class of a record field. Maps 1:1 onto SQLite column affinities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Integer,
    Real,
    Blob,
}

impl FieldKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldKind::Text => "TEXT",
            FieldKind::Integer => "INTEGER",
            FieldKind::Real => "REAL",
            FieldKind::Blob => "BLOB",
        }
    }
}

/// One entry of an item's schema descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
}

impl Field {
    /// Column definition as used in `CREATE TABLE`.
    pub fn sql_column(&self) -> String {
        if self.nullable {
            format!("{} {}", self.name, self.kind.sql_type())
        } else {
            format!("{} {} NOT NULL", self.name, self.kind.sql_type())
        }
    }

    /// Converts the textual form of a value (a CSV cell, an AWK column)
    /// back into a typed value. Empty text is NULL for nullable fields.
    pub fn parse_text(&self, text: &str) -> Result<Value> {
        if self.nullable && text.is_empty() {
            return Ok(Value::Null);
        }
        match self.kind {
            FieldKind::Text => Ok(Value::Text(text.to_string())),
            FieldKind::Integer => text
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| CountmeError::malformed(self.name, text, "expected an integer")),
            FieldKind::Real => text
                .parse::<f64>()
                .map(Value::Real)
                .map_err(|_| CountmeError::malformed(self.name, text, "expected a number")),
            FieldKind::Blob => decode_hex(text)
                .map(Value::Blob)
                .ok_or_else(|| CountmeError::malformed(self.name, text, "expected hex bytes")),
        }
    }
}

/// A dynamically-typed field value, the common currency between items and
/// the storage backends.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Text form used by the CSV and AWK backends. NULL becomes the empty
    /// string and blobs are hex-encoded.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed(""),
            Value::Integer(i) => Cow::Owned(i.to_string()),
            Value::Real(r) => Cow::Owned(r.to_string()),
            Value::Text(s) => Cow::Borrowed(s),
            Value::Blob(b) => Cow::Owned(encode_hex(b)),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl rusqlite::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, ValueRef};
        Ok(ToSqlOutput::Borrowed(match self {
            Value::Null => ValueRef::Null,
            Value::Integer(i) => ValueRef::Integer(*i),
            Value::Real(r) => ValueRef::Real(*r),
            Value::Text(s) => ValueRef::Text(s.as_bytes()),
            Value::Blob(b) => ValueRef::Blob(b),
        }))
    }
}

impl rusqlite::types::FromSql for Value {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        use rusqlite::types::ValueRef;
        Ok(match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        })
    }
}

/// Conversion between a Rust field type and [`Value`], carrying the
/// schema information for that type.
pub trait FieldValue: Sized {
    const KIND: FieldKind;
    const NULLABLE: bool;

    fn to_value(&self) -> Value;
    fn from_value(field: &str, value: Value) -> Result<Self>;
}

fn type_error(field: &str, value: &Value, reason: &'static str) -> CountmeError {
    CountmeError::MalformedRecordField {
        field: field.to_string(),
        value: format!("{} {}", value.type_name(), value),
        reason,
    }
}

impl FieldValue for String {
    const KIND: FieldKind = FieldKind::Text;
    const NULLABLE: bool = false;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Integer(i) => Ok(i.to_string()),
            other => Err(type_error(field, &other, "expected text")),
        }
    }
}

impl FieldValue for i64 {
    const KIND: FieldKind = FieldKind::Integer;
    const NULLABLE: bool = false;

    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(i),
            Value::Text(s) => s
                .parse()
                .map_err(|_| CountmeError::malformed(field, &s, "expected an integer")),
            other => Err(type_error(field, &other, "expected an integer")),
        }
    }
}

impl FieldValue for f64 {
    const KIND: FieldKind = FieldKind::Real;
    const NULLABLE: bool = false;

    fn to_value(&self) -> Value {
        Value::Real(*self)
    }

    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::Real(r) => Ok(r),
            Value::Integer(i) => Ok(i as f64),
            other => Err(type_error(field, &other, "expected a number")),
        }
    }
}

impl FieldValue for Vec<u8> {
    const KIND: FieldKind = FieldKind::Blob;
    const NULLABLE: bool = false;

    fn to_value(&self) -> Value {
        Value::Blob(self.clone())
    }

    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::Blob(b) => Ok(b),
            other => Err(type_error(field, &other, "expected a blob")),
        }
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const KIND: FieldKind = T::KIND;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(field, other).map(Some),
        }
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{:02x}", b);
    }
    out
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| text.get(i..i + 2).and_then(|h| u8::from_str_radix(h, 16).ok()))
        .collect()
}
