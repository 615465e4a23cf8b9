//! Fixed-width rendering of interaction log lines.
//!
//! Every field of a log line is rendered to an exact column width: values are
//! converted to text according to their kind, cut with a trailing `...` when
//! they are too long and right-padded when they are too short. Rendering never
//! fails; a value that cannot be rendered turns into an inline error message.

use std::fmt;
use std::io;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::constants::{
    DEFAULT_FIELD_WIDTH, ELLIPSIS, FIELD_SEPARATOR, FIELD_WIDTHS, LOG_ID_LEN, TIMESTAMP_FORMAT,
};

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rendered text is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// A value that can be written into a log column.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Mapping(Map<String, Value>),
    Sequence(Vec<Value>),
    /// Anything else, already converted with its `Display` impl.
    Other(String),
}

impl FieldValue {
    pub fn other(value: impl fmt::Display) -> Self {
        FieldValue::Other(value.to_string())
    }

    fn render(&self) -> Result<String, FormatError> {
        match self {
            FieldValue::Text(text) => Ok(text.clone()),
            FieldValue::Integer(n) => Ok(n.to_string()),
            FieldValue::Real(x) => Ok(format!("{:.2}", x)),
            FieldValue::Boolean(b) => Ok(b.to_string()),
            FieldValue::Mapping(map) => to_spaced_json(map),
            FieldValue::Sequence(items) => to_spaced_json(items),
            FieldValue::Other(text) => Ok(text.clone()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(n) => FieldValue::Integer(n),
            Err(_) => FieldValue::other(value),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Real(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<Map<String, Value>> for FieldValue {
    fn from(value: Map<String, Value>) -> Self {
        FieldValue::Mapping(value)
    }
}

impl From<Vec<Value>> for FieldValue {
    fn from(value: Vec<Value>) -> Self {
        FieldValue::Sequence(value)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => FieldValue::Text(text),
            Value::Bool(b) => FieldValue::Boolean(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Integer(i)
                } else if n.is_u64() {
                    FieldValue::other(n)
                } else {
                    FieldValue::Real(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::Object(map) => FieldValue::Mapping(map),
            Value::Array(items) => FieldValue::Sequence(items),
            Value::Null => FieldValue::other("null"),
        }
    }
}

/// JSON writer using `", "` between items and `": "` after keys.
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

// serde_json never escapes non-ASCII characters, so they survive as-is.
fn to_spaced_json<T>(value: &T) -> Result<String, FormatError>
where
    T: Serialize + ?Sized,
{
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8(buf)?)
}

/// Caller-supplied log fields, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogData {
    fields: Vec<(String, FieldValue)>,
}

impl LogData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.push(name, value);
        self
    }

    /// Adds a field. Re-using a name replaces the value but keeps the
    /// original position.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for LogData
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = LogData::new();
        for (name, value) in iter {
            data.push(name, value);
        }
        data
    }
}

/// One assembled log line: rendered columns in output order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    fields: Vec<String>,
}

impl LogEntry {
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fields.join(FIELD_SEPARATOR))
    }
}

#[derive(Debug, Clone)]
pub struct LogFormatter {
    max_field_length: usize,
    padding_char: char,
}

impl Default for LogFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_FIELD_WIDTH, ' ')
    }
}

impl LogFormatter {
    pub fn new(max_field_length: usize, padding_char: char) -> Self {
        Self {
            max_field_length,
            padding_char,
        }
    }

    pub fn max_field_length(&self) -> usize {
        self.max_field_length
    }

    /// Column width for a field name, falling back to the default width.
    pub fn field_width(&self, field_name: &str) -> usize {
        FIELD_WIDTHS
            .get(field_name)
            .copied()
            .unwrap_or(self.max_field_length)
    }

    /// Renders `value` to exactly `width` characters (`None` or `Some(0)`
    /// means the default width). `field_name` only appears in the error text.
    pub fn format_field(&self, value: &FieldValue, field_name: &str, width: Option<usize>) -> String {
        let width = match width {
            Some(w) if w > 0 => w,
            _ => self.max_field_length,
        };
        match value.render() {
            Ok(text) => self.pad(truncate(&text, width), width),
            Err(e) => self.pad(format!("Error formatting {}: {}", field_name, e), width),
        }
    }

    fn pad(&self, mut text: String, width: usize) -> String {
        let len = text.chars().count();
        text.extend(std::iter::repeat(self.padding_char).take(width.saturating_sub(len)));
        text
    }

    /// Assembles the entry for an explicit clock reading and id.
    pub fn create_log_entry_at(
        &self,
        timestamp: NaiveDateTime,
        log_id: &str,
        log_data: &LogData,
    ) -> LogEntry {
        let timestamp = timestamp.format(TIMESTAMP_FORMAT).to_string();
        let mut fields = Vec::with_capacity(log_data.len() + 2);
        fields.push(self.format_field(
            &FieldValue::Text(timestamp),
            "timestamp",
            Some(self.field_width("timestamp")),
        ));
        fields.push(self.format_field(
            &FieldValue::from(log_id),
            "log_id",
            Some(self.field_width("log_id")),
        ));
        for (name, value) in log_data.iter() {
            fields.push(self.format_field(value, name, Some(self.field_width(name))));
        }
        LogEntry { fields }
    }

    /// Builds a log line stamped with the local time and a fresh short id.
    pub fn create_log_entry(&self, log_data: &LogData) -> String {
        let log_id: String = Uuid::new_v4().to_string().chars().take(LOG_ID_LEN).collect();
        self.create_log_entry_at(Local::now().naive_local(), &log_id, log_data)
            .to_string()
    }
}

// Keeps `width - 3` characters plus "..."; below 3 columns only the part of
// the ellipsis that fits is kept.
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let keep = width.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.extend(ELLIPSIS.chars().take(width - keep));
    out
}
