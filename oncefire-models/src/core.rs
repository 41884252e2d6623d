use std::{
    fmt,
    path::{Path, PathBuf},
};

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wall-clock format shared by `trigger_time` and `executed_at`.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Reserved body field carrying the device key list.
pub const DEVICE_KEYS_FIELD: &str = "device_keys";

/// Stable identifier of a task record, the path it was discovered at.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(PathBuf);

impl TaskId {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TaskId(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// A known record field holding a JSON value of the wrong type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: &'static str,
    pub expected: &'static str,
    pub found: Value,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}' should be {}, found {}",
            self.field, self.expected, self.found
        )
    }
}

impl std::error::Error for FieldError {}

/// One fire-once task definition.
///
/// The record keeps the whole JSON object it was read from, so fields the
/// runner does not interpret are written back untouched and in their original
/// order. Only [`TaskRecord::mark_executed`] mutates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskRecord {
    document: Map<String, Value>,
}

impl TaskRecord {
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    pub fn trigger_time(&self) -> Result<Option<&str>, FieldError> {
        self.text("trigger_time")
    }

    pub fn timezone(&self) -> Result<Option<&str>, FieldError> {
        self.text("timezone")
    }

    pub fn webhook_url(&self) -> Result<Option<&str>, FieldError> {
        self.text("webhook_url")
    }

    pub fn method(&self) -> Result<Option<&str>, FieldError> {
        self.text("method")
    }

    pub fn body(&self) -> Result<Option<&Map<String, Value>>, FieldError> {
        match self.document.get("body") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(body)) => Ok(Some(body)),
            Some(other) => Err(FieldError {
                field: "body",
                expected: "an object",
                found: other.clone(),
            }),
        }
    }

    /// Only the JSON literal `true` counts; anything else is "not executed".
    pub fn is_executed(&self) -> bool {
        matches!(self.document.get("executed"), Some(Value::Bool(true)))
    }

    pub fn executed_at(&self) -> Option<&str> {
        self.document.get("executed_at").and_then(Value::as_str)
    }

    /// Terminal transition: sets `executed` and stamps `executed_at` in the
    /// zone of `at`.
    pub fn mark_executed<Tz>(&mut self, at: &DateTime<Tz>)
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        self.document.insert("executed".into(), Value::Bool(true));
        self.document.insert(
            "executed_at".into(),
            Value::String(at.format(TIME_FORMAT).to_string()),
        );
    }

    fn text(&self, field: &'static str) -> Result<Option<&str>, FieldError> {
        match self.document.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.as_str())),
            Some(other) => Err(FieldError {
                field,
                expected: "a string",
                found: other.clone(),
            }),
        }
    }
}
