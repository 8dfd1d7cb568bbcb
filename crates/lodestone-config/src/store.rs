//! Key-value state store.
//!
//! Machine-managed state (the repository registry, the bootstrap server URL) lives
//! in a flat key-value document, separate from the user-edited `config.toml`.
//! Every [`KeyValueStore::save`] rewrites the whole document.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use lodestone_utils::fs::write_atomic;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{ConfigError, Result};

/// Key-value store used to persist machine state.
pub trait KeyValueStore: Send {
    /// Returns the value stored under `key`.
    fn get(&self, key: &str) -> Option<Value>;

    /// Returns the value stored under `key`, or `default` when absent.
    fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    /// Stores `value` under `key`. Not durable until [`save`](KeyValueStore::save).
    fn set(&mut self, key: &str, value: Value);

    /// Persists the full document.
    fn save(&mut self) -> Result<()>;
}

/// A [`KeyValueStore`] backed by a pretty-printed JSON file.
pub struct JsonFileStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonFileStore {
    /// Opens the store at `path`.
    ///
    /// A missing file yields an empty store; the file is created on the first save.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::StateParse`] if the file exists but is not a JSON object,
    /// and [`ConfigError::IoError`] if it cannot be read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let values = match fs::read(&path) {
            Ok(content) if content.iter().all(u8::is_ascii_whitespace) => Map::new(),
            Ok(content) => {
                serde_json::from_slice::<Map<String, Value>>(&content).map_err(|source| {
                    ConfigError::StateParse {
                        path: path.clone(),
                        source,
                    }
                })?
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("State file {} not found, starting empty", path.display());
                Map::new()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        Ok(Self {
            path,
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn save(&mut self) -> Result<()> {
        let serialized =
            serde_json::to_vec_pretty(&self.values).map_err(ConfigError::StateSerialize)?;
        write_atomic(&self.path, &serialized)?;
        trace!("State saved to {}", self.path.display());
        Ok(())
    }
}

/// An in-memory [`KeyValueStore`], for headless use and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: Map<String, Value>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times [`KeyValueStore::save`] was called.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn save(&mut self) -> Result<()> {
        self.saves += 1;
        Ok(())
    }
}
