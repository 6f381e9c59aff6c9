//! # IMULink - A Sensor-Device Command & Telemetry Protocol Engine
//!
//! IMULink is the command/settings layer of an inertial sensor device's
//! control protocol, written in Rust. A host sends line-delimited
//! single-pair JSON commands over serial or UDP; the device resolves each
//! command against a typed settings registry or a fixed verb table,
//! mutates or reads state, and replies with JSON responses and CSV
//! telemetry.
//!
//! ## Features
//!
//! - **Typed settings registry**: ~75 named, bounded, typed slots with
//!   read-only gating for factory-programmed fields
//! - **Bounded tokenizer**: an explicit state machine that can never
//!   overflow its key/value storage, however hostile the input
//! - **Two-tier dispatch**: settings first, fixed command verbs second,
//!   with hash-based lookup throughout
//! - **Byte-stable encoding**: golden-file-testable JSON responses and
//!   CSV telemetry
//! - **Async transport**: Tokio-driven UDP endpoint plus a 1 Hz
//!   discovery broadcaster
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              IMULink                                │
//! │                                                                     │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐              │
//! │  │ UDP / serial│───>│   Session   │───>│  Tokenizer  │              │
//! │  │  transport  │    │  (framing)  │    │ (state mc.) │              │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘              │
//! │                                               │                     │
//! │                                               ▼                     │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────┐    │
//! │  │   Encoder   │<───│             CommandHandler               │    │
//! │  │ JSON + CSV  │    │  tier 1: SettingsRegistry (hash lookup)  │    │
//! │  └─────────────┘    │  tier 2: fixed verbs (save, ping, ...)   │    │
//! │                     └──────┬──────────────────────┬────────────┘    │
//! │                            │                      │                 │
//! │                            ▼                      ▼                 │
//! │                  ┌───────────────┐      ┌──────────────────┐        │
//! │                  │  ConfigStore  │      │  DeviceControl   │        │
//! │                  │ (persistence) │      │  (capabilities)  │        │
//! │                  └───────────────┘      └──────────────────┘        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use imulink::commands::{CommandHandler, DeviceState, NullDeviceControl};
//! use imulink::settings::MemoryStore;
//!
//! let mut handler = CommandHandler::new(
//!     DeviceState::default(),
//!     Box::new(NullDeviceControl),
//!     Box::new(MemoryStore::default()),
//! );
//!
//! // Read a setting
//! let replies = handler.dispatch_line(b"{\"ahrsGain\":null}\n");
//! assert_eq!(replies[0].serialize(), b"{\"ahrsGain\":0.5000}\r\n");
//!
//! // Write a setting; the new value is echoed back
//! let replies = handler.dispatch_line(b"{\"ahrsGain\":0.8}\n");
//! assert_eq!(replies[0].serialize(), b"{\"ahrsGain\":0.8000}\r\n");
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: key hashing, the command tokenizer, and the outbound
//!   message encoder
//! - [`settings`]: the typed settings registry and persistence bridge
//! - [`commands`]: two-tier command dispatch and the device capability
//!   traits
//! - [`session`]: line framing, the UDP endpoint, and the discovery
//!   broadcaster
//!
//! ## Design Highlights
//!
//! ### Bounded Everything
//!
//! The classic failure mode of this protocol layer is a fixed `char[]`
//! buffer copied into without a length check. Every inbound copy here is
//! capped: tokenizer keys and values, string settings, float arrays. An
//! oversized input truncates deterministically instead of corrupting its
//! neighbours.
//!
//! ### Compile-Time Hash Constants
//!
//! Command verbs are matched by djb2 hash. The constants are computed by
//! a `const fn` from the verb strings, so there is no table of literals
//! to drift out of sync when the hash width or a verb changes.
//!
//! ### Single Control Thread
//!
//! Dispatch runs synchronously to completion on one task: no command can
//! observe a half-applied write, and the registry needs no locking. The
//! only shared state, the discovery announcement, crosses to the
//! broadcaster task through a `watch` channel as an immutable snapshot.

pub mod commands;
pub mod protocol;
pub mod session;
pub mod settings;

// Re-export commonly used types for convenience
pub use commands::{CommandHandler, DeviceControl, DeviceState, NullDeviceControl};
pub use protocol::{
    djb2, tokenize, Announcement, OutboundMessage, ParsedCommand, ResponseMessage,
    TelemetryMessage, TokenizeError, ValueInput, ValueKind, WireValue,
};
pub use session::{run_udp_endpoint, Announcer, Session, SessionStats};
pub use settings::{
    ConfigStore, JsonFileStore, MemoryStore, PersistenceError, SettingEntry, SettingError,
    SettingValue, SettingsRegistry,
};

/// The default UDP port the command endpoint listens on.
pub const DEFAULT_COMMAND_PORT: u16 = 9000;

/// Version of IMULink
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
