//! Flat key-value settings store with JSON file persistence.
//!
//! Options are plain JSON values in a single object file (bot token, command
//! prefix, ...). Reads are concurrent; `set` is a plain map write and
//! `persist` rewrites the file it was loaded from.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde_json::Value;
use tracing::{info, warn};

use crate::Result;

pub struct Settings {
    path: PathBuf,
    values: DashMap<String, Value>,
}

impl Settings {
    /// Load the settings file at `path`. Fails when the file is missing or
    /// not a JSON object.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = fs::read_to_string(&path)?;
        let parsed: BTreeMap<String, Value> = serde_json::from_str(&content)?;
        let values = DashMap::new();
        for (name, value) in parsed {
            values.insert(name, value);
        }
        Ok(Self { path, values })
    }

    /// Load `path`, falling back to an empty store when the file does not
    /// exist yet. A malformed file still fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!(target: "settings", path = %path.display(), "No settings file found; starting empty");
            Ok(Self {
                path: path.to_path_buf(),
                values: DashMap::new(),
            })
        }
    }

    /// Get an option's value.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).map(|v| v.value().clone())
    }

    /// Get an option's value as a string, when it is one.
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| v.as_str().map(|s| s.to_string()))
    }

    /// Set an option's value. In-memory only until [`persist`](Self::persist).
    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Write the current values back to the file this store was loaded from.
    pub fn persist(&self) -> Result<()> {
        // BTreeMap keeps the file diff-stable across writes.
        let snapshot: BTreeMap<String, Value> = self
            .values
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let content = serde_json::to_string_pretty(&snapshot)?;
        if let Err(e) = fs::write(&self.path, content) {
            warn!(target: "settings", path = %self.path.display(), error = %e, "Failed to persist settings");
            return Err(e.into());
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
