//! Command Dispatch Module
//!
//! This module implements the command processing layer for the device.
//! It receives parsed commands, resolves them against the settings
//! registry and the fixed command table, and returns the outbound
//! messages to send.
//!
//! ## Architecture
//!
//! ```text
//! Host command line
//!       │
//!       ▼
//! ┌─────────────────┐
//! │   Tokenizer     │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐       ┌──────────────────┐
//! │ CommandHandler  │──────>│ SettingsRegistry │  tier 1: settings
//! │                 │       └──────────────────┘
//! │  - hash key     │       ┌──────────────────┐
//! │  - tier lookup  │──────>│  Fixed verbs     │  tier 2: commands
//! │  - execute      │       └────────┬─────────┘
//! └────────┬────────┘                │
//!          │                         ▼
//!          │               ┌──────────────────┐
//!          │               │  DeviceControl   │  (capability trait)
//!          │               │  ConfigStore     │  (persistence bridge)
//!          │               └──────────────────┘
//!          ▼
//!   OutboundMessage list
//! ```
//!
//! The settings tier always wins: a setting name shadows a fixed command
//! with the same name.

pub mod handler;

// Re-export the main dispatch types
pub use handler::{CommandHandler, DeviceControl, DeviceState, NullDeviceControl};
