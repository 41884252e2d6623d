use std::path::PathBuf;

use oncefire_models::core::FieldError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TaskError>;

/// Failures local to one task record. The runner catches every variant; none
/// of them ends a run.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Listing the task directory failed.
    #[error("failed to discover task records in '{}': {source}", .dir.display())]
    Discovery {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The record file could not be read.
    #[error("failed to read task record '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The record file is not a JSON object.
    #[error("failed to parse task record '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A known field carries the wrong JSON type.
    #[error("malformed task record: {0}")]
    Field(#[from] FieldError),

    /// `trigger_time` does not match the record time format.
    #[error("invalid trigger_time '{value}': {reason}")]
    TriggerTime { value: String, reason: String },

    /// The zone name is not in the IANA database.
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    /// `body.device_keys` is present but not a list of strings.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// `method` is not a valid HTTP verb.
    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("task record has no webhook_url")]
    MissingWebhookUrl,

    /// Serializing the updated record failed.
    #[error("failed to serialize task record '{}': {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Writing the updated record back failed.
    #[error("failed to write task record '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
