//! Command Protocol Implementation
//!
//! This module implements the wire protocol the device speaks with its
//! host: line-delimited single-pair JSON objects inbound, JSON responses
//! and CSV telemetry outbound.
//!
//! ## Overview
//!
//! ```text
//! {"ahrsGain":0.8}\n          ──>  tokenizer  ──>  ParsedCommand
//!
//! ResponseMessage / TelemetryMessage  ──>  encoder  ──>
//!     {"ahrsGain":0.8000}\r\n
//!     I,12345,1.0000,...\r\n
//! ```
//!
//! ## Modules
//!
//! - `hash`: the djb2 key hasher used for all command/setting lookups
//! - `tokenizer`: the bounded scanner that extracts one (key, value) pair
//! - `types`: inbound value types and the outbound message encoder

pub mod hash;
pub mod tokenizer;
pub mod types;

// Re-export commonly used items for convenience
pub use hash::djb2;
pub use tokenizer::{tokenize, ParsedCommand, TokenizeError, KEY_CAPACITY, VALUE_CAPACITY};
pub use types::{
    Announcement, OutboundMessage, PingInfo, ResponseMessage, TelemetryMessage, ValueInput,
    ValueKind, WireValue, CRLF,
};
