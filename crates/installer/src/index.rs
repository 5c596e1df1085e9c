//! Persisted record of which file currently satisfies each project
//!
//! Stored as a flat JSON object, `{"<projectId>": "<fileName>"}`, next to
//! the pack. A missing index file means nothing has been installed yet.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::error::{FileOperation, InstallError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallIndex {
    entries: BTreeMap<String, String>,
}

impl InstallIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the index, treating a missing file as empty
    pub async fn load(path: &Path) -> Result<Self> {
        let json = match fs::read_to_string(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No index at {}, starting empty", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(InstallError::fs(path, FileOperation::Read)(e)),
        };

        let index: InstallIndex = serde_json::from_str(&json).map_err(|source| InstallError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded index with {} entries from {}", index.len(), path.display());
        Ok(index)
    }

    /// Write the index; returns `false` without touching disk when empty
    pub async fn persist(&self, path: &Path) -> Result<bool> {
        if self.is_empty() {
            return Ok(false);
        }

        let json = serde_json::to_string_pretty(self).map_err(|source| InstallError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json)
            .await
            .map_err(InstallError::fs(path, FileOperation::Write))?;
        debug!("Persisted index with {} entries to {}", self.len(), path.display());
        Ok(true)
    }

    /// Record `file_name` for `project_id`; returns the previous file if it differs
    pub fn record_and_supersede(&mut self, project_id: &str, file_name: &str) -> Option<String> {
        let previous = self.entries.insert(project_id.to_string(), file_name.to_string());
        previous.filter(|old| old != file_name)
    }

    pub fn get(&self, project_id: &str) -> Option<&str> {
        self.entries.get(project_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
