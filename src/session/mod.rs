//! Session Module
//!
//! This module runs the device's transport-facing loops: the command
//! endpoint that turns inbound bytes into dispatched commands and
//! replies, and the discovery broadcaster that announces the device on
//! the local network.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    UDP command endpoint                     │
//! │                                                             │
//! │  datagram ──> Session ──> CommandHandler ──> replies        │
//! │                  │                                          │
//! │                  └── announcement snapshot ──┐              │
//! └──────────────────────────────────────────────┼──────────────┘
//!                                                │ watch channel
//!                                                ▼
//!                              ┌───────────────────────────┐
//!                              │         Announcer         │
//!                              │   (Background Tokio Task) │
//!                              │   1 Hz UDP broadcast      │
//!                              └───────────────────────────┘
//! ```

pub mod announce;
pub mod handler;

// Re-export commonly used types
pub use announce::{Announcer, ANNOUNCEMENT_INTERVAL, ANNOUNCEMENT_PORT};
pub use handler::{run_udp_endpoint, Session, SessionError, SessionStats};
