use std::{
    fs,
    path::{Path, PathBuf},
};

use log::debug;
use oncefire_models::core::{TaskId, TaskRecord};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::error::{Result, TaskError};

/// Where task records come from and go back to.
///
/// Implementations assume a single runner at a time; nothing here locks.
pub trait TaskStore {
    fn discover(&self) -> Result<Vec<TaskId>>;
    fn read(&self, id: &TaskId) -> Result<TaskRecord>;
    fn save(&self, id: &TaskId, record: &TaskRecord) -> Result<()>;
}

/// One `*.json` file per task in a flat directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TaskStore for DirectoryStore {
    fn discover(&self) -> Result<Vec<TaskId>> {
        let entries = fs::read_dir(&self.dir).map_err(|source| TaskError::Discovery {
            dir: self.dir.clone(),
            source,
        })?;

        let mut ids: Vec<TaskId> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
            .map(TaskId::new)
            .collect();
        ids.sort();
        debug!("Discovered {} task record(s) in {}", ids.len(), self.dir.display());
        Ok(ids)
    }

    fn read(&self, id: &TaskId) -> Result<TaskRecord> {
        let path = id.as_path();
        let data = fs::read_to_string(path).map_err(|source| TaskError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| TaskError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the record with four-space indentation, non-ASCII text kept
    /// as-is.
    fn save(&self, id: &TaskId, record: &TaskRecord) -> Result<()> {
        let path = id.as_path();
        let mut buffer = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
        record
            .serialize(&mut serializer)
            .map_err(|source| TaskError::Serialize {
                path: path.to_path_buf(),
                source,
            })?;
        fs::write(path, buffer).map_err(|source| TaskError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
