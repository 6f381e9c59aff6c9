//! Settings Module
//!
//! This module provides the device's configuration layer: the typed
//! settings registry and the persistence bridge that loads and saves it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SettingsRegistry                       │
//! │                                                         │
//! │  index  name                        slot                │
//! │  ─────  ──────────────────────────  ──────────────────  │
//! │  0      calibrationDate             Str[32]  (RO)       │
//! │  1      gyroscopeMisalignment       FloatArray[9]       │
//! │  ...                                                    │
//! │  n      rssiMessageRateDivisor      Int                 │
//! └───────────────────────┬─────────────────────────────────┘
//!                         │ to_document / apply_document
//!                         ▼
//!              ┌─────────────────────┐
//!              │     ConfigStore     │   (trait)
//!              ├─────────────────────┤
//!              │ JsonFileStore       │   config.json + defaults
//!              │ MemoryStore         │   tests / embedding
//!              └─────────────────────┘
//! ```
//!
//! Every entry owns one typed, bounded slot; writes are type-checked and
//! a failed write never leaves a partially updated slot behind.

pub mod persistence;
pub mod registry;
pub mod value;

// Re-export commonly used types
pub use persistence::{ConfigStore, JsonFileStore, MemoryStore, PersistenceError};
pub use registry::{SettingEntry, SettingsRegistry, REGISTRY_CAPACITY};
pub use value::{BoundedString, FloatVector, SettingError, SettingValue, MAX_FLOAT_VECTOR_LEN};
