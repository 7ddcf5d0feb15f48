//! Key-value persistence boundary for discovered links.
//!
//! The link store treats an external get/set store as the source of truth
//! across restarts, keyed by a single fixed key. The bundled implementation
//! keeps a flat JSON object map in one file.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

/// Fixed key under which discovered links are stored.
pub const LINKS_KEY: &str = "custom_links";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// File-backed store: one JSON object, string values.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_map(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read store file: {}", self.path.display()))?;
        let value: Value =
            serde_json::from_str(&contents).context("Store file is not valid JSON")?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let map = self.read_map()?;
        Ok(map.get(key).and_then(Value::as_str).map(String::from))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        let serialized = serde_json::to_string_pretty(&map)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write store file: {}", self.path.display()))?;
        Ok(())
    }
}
