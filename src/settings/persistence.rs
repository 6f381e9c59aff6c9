//! Configuration Persistence Bridge
//!
//! The registry never touches storage directly. Instead the dispatcher
//! talks to a [`ConfigStore`]: a narrow load/save seam over the JSON
//! configuration document, with the actual medium (flash filesystem, SD
//! card, plain files on a host) behind the trait.
//!
//! Two stores are provided:
//!
//! - [`JsonFileStore`] backs the document with two files: the live
//!   configuration and the factory default configuration (consumed by the
//!   `default` command)
//! - [`MemoryStore`] keeps the documents in memory, for tests and
//!   embedding

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

/// Errors from loading or saving the configuration document.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backing medium failed
    #[error("configuration store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document is not valid JSON
    #[error("configuration document is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The stored document parses but is not a JSON object
    #[error("configuration document root must be an object")]
    NotAnObject,
}

/// The persistence seam consumed by the command dispatcher.
///
/// Load must be all-or-nothing at the document level: a store either
/// produces a complete parsed document or an error, never a partial one.
/// Per-entry validation happens in the registry.
pub trait ConfigStore: Send {
    /// Loads the live configuration document.
    fn load(&self) -> Result<serde_json::Value, PersistenceError>;

    /// Loads the factory default configuration document.
    fn load_defaults(&self) -> Result<serde_json::Value, PersistenceError>;

    /// Persists the configuration document.
    fn save(&self, doc: &serde_json::Value) -> Result<(), PersistenceError>;
}

/// File-backed configuration store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    config_path: PathBuf,
    defaults_path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store over a live configuration file and a factory
    /// defaults file.
    pub fn new(config_path: impl Into<PathBuf>, defaults_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            defaults_path: defaults_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn read_document(path: &Path) -> Result<serde_json::Value, PersistenceError> {
        let bytes = std::fs::read(path)?;
        let doc: serde_json::Value = serde_json::from_slice(&bytes)?;
        if !doc.is_object() {
            return Err(PersistenceError::NotAnObject);
        }
        Ok(doc)
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self) -> Result<serde_json::Value, PersistenceError> {
        debug!(path = %self.config_path.display(), "loading configuration");
        Self::read_document(&self.config_path)
    }

    fn load_defaults(&self) -> Result<serde_json::Value, PersistenceError> {
        debug!(path = %self.defaults_path.display(), "loading default configuration");
        Self::read_document(&self.defaults_path)
    }

    fn save(&self, doc: &serde_json::Value) -> Result<(), PersistenceError> {
        debug!(path = %self.config_path.display(), "saving configuration");
        let bytes = serde_json::to_vec_pretty(doc)?;
        std::fs::write(&self.config_path, bytes)?;
        Ok(())
    }
}

/// In-memory configuration store.
///
/// `save` replaces the live document; `load` returns the last saved
/// document, or the defaults if nothing has been saved yet.
#[derive(Debug)]
pub struct MemoryStore {
    saved: Mutex<Option<serde_json::Value>>,
    defaults: serde_json::Value,
}

impl MemoryStore {
    pub fn new(defaults: serde_json::Value) -> Self {
        Self {
            saved: Mutex::new(None),
            defaults,
        }
    }

    /// Returns a copy of the last saved document, if any.
    pub fn saved(&self) -> Option<serde_json::Value> {
        self.saved.lock().expect("store lock poisoned").clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(serde_json::Value::Object(serde_json::Map::new()))
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<serde_json::Value, PersistenceError> {
        Ok(self
            .saved()
            .unwrap_or_else(|| self.defaults.clone()))
    }

    fn load_defaults(&self) -> Result<serde_json::Value, PersistenceError> {
        Ok(self.defaults.clone())
    }

    fn save(&self, doc: &serde_json::Value) -> Result<(), PersistenceError> {
        *self.saved.lock().expect("store lock poisoned") = Some(doc.clone());
        Ok(())
    }
}
