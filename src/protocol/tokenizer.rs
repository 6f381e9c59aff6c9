//! Command Tokenizer
//!
//! This module extracts a single (key, value) pair from one
//! newline-delimited command buffer. Inbound commands are flat,
//! single-pair JSON objects:
//!
//! ```text
//! {"ahrsGain":0.8}\n       write request
//! {"ahrsGain":null}\n      read request
//! {"note":"hello"}\n       string value
//! ```
//!
//! ## Design
//!
//! The tokenizer is an explicit state machine rather than a full JSON
//! parser. Commands are tiny, arrive on a byte stream, and only ever hold
//! one key and one scalar-or-array value, so a scanner that walks the
//! buffer once is both sufficient and easy to test transition by
//! transition:
//!
//! ```text
//! AwaitObjectStart --'{'--> AwaitKey --'"'--> InKey --'"'--> AwaitColon
//!                                                                │ ':'
//!                                  Done <--'}'-- InValue <───────┘
//! ```
//!
//! Nested objects are not supported: the value ends at the first `}`.
//!
//! ## Bounds
//!
//! Key and value storage is hard-capped ([`KEY_CAPACITY`] and
//! [`VALUE_CAPACITY`]). Input longer than either cap is truncated
//! deterministically; the scanner keeps consuming bytes so the message
//! still terminates cleanly, but no byte is ever written past the cap.
//! The caller can rely on `key.len() <= KEY_CAPACITY` and
//! `raw_value.len() <= VALUE_CAPACITY` for every accepted message.

use crate::protocol::types::ValueKind;
use thiserror::Error;

/// Maximum stored key length in bytes.
pub const KEY_CAPACITY: usize = 31;

/// Maximum stored raw-value length in bytes.
pub const VALUE_CAPACITY: usize = 126;

/// One parsed command: the key, the raw value text, and the value's
/// classification. Constructed fresh per message and discarded after
/// dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    /// Command key, at most [`KEY_CAPACITY`] bytes
    pub key: String,
    /// Raw value text exactly as received (quotes included for strings),
    /// at most [`VALUE_CAPACITY`] bytes
    pub raw_value: String,
    /// Classification from the value's first significant byte
    pub kind: ValueKind,
}

/// Errors produced by a structurally broken command buffer.
///
/// The session layer treats all of these the same way: log and drop,
/// with no response on the wire.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// No `{` before the end of the buffer
    #[error("no object start before end of input")]
    MissingObjectStart,

    /// No `"` opening the key after `{`
    #[error("no key after object start")]
    MissingKey,

    /// Buffer ended inside the key
    #[error("unterminated key")]
    UnterminatedKey,

    /// No `:` between key and value
    #[error("no colon after key")]
    MissingColon,

    /// Buffer ended before the closing `}`
    #[error("unterminated value")]
    UnterminatedValue,
}

/// Scanner states. One state per structural position in the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    AwaitObjectStart,
    AwaitKey,
    InKey,
    AwaitColon,
    InValue,
    Done,
}

/// Tokenizes one command buffer.
///
/// # Returns
///
/// - `Ok(Some(command))` - a well-formed single-pair object was found
/// - `Ok(None)` - the buffer holds no command (empty or whitespace only)
/// - `Err(e)` - the buffer is structurally broken
///
/// A trailing `\n` or `\r\n` terminator is tolerated; bytes after the
/// closing `}` are ignored.
pub fn tokenize(buf: &[u8]) -> Result<Option<ParsedCommand>, TokenizeError> {
    let mut state = ScanState::AwaitObjectStart;
    let mut key = String::new();
    let mut raw_value = String::new();
    let mut kind = ValueKind::Undefined;
    let mut value_started = false;

    for &byte in buf {
        match state {
            ScanState::AwaitObjectStart => {
                if byte == b'{' {
                    state = ScanState::AwaitKey;
                }
            }
            ScanState::AwaitKey => {
                if byte == b'"' {
                    state = ScanState::InKey;
                } else if byte == b'}' {
                    return Err(TokenizeError::MissingKey);
                }
            }
            ScanState::InKey => {
                if byte == b'"' {
                    state = ScanState::AwaitColon;
                } else if key.len() < KEY_CAPACITY {
                    push_byte(&mut key, byte);
                }
                // Over-long keys are truncated; the scan continues so the
                // closing quote is still honoured.
            }
            ScanState::AwaitColon => {
                if byte == b':' {
                    state = ScanState::InValue;
                } else if byte == b'}' {
                    return Err(TokenizeError::MissingColon);
                }
            }
            ScanState::InValue => {
                if !value_started && byte.is_ascii_whitespace() {
                    continue;
                }
                if !value_started {
                    value_started = true;
                    kind = ValueKind::classify(byte);
                }
                if byte == b'}' {
                    state = ScanState::Done;
                } else if raw_value.len() < VALUE_CAPACITY {
                    push_byte(&mut raw_value, byte);
                }
            }
            ScanState::Done => break,
        }
    }

    match state {
        ScanState::Done => Ok(Some(ParsedCommand {
            key,
            raw_value,
            kind,
        })),
        ScanState::AwaitObjectStart => {
            if buf.iter().all(|b| b.is_ascii_whitespace()) {
                Ok(None)
            } else {
                Err(TokenizeError::MissingObjectStart)
            }
        }
        ScanState::AwaitKey => Err(TokenizeError::MissingKey),
        ScanState::InKey => Err(TokenizeError::UnterminatedKey),
        ScanState::AwaitColon => Err(TokenizeError::MissingColon),
        ScanState::InValue => Err(TokenizeError::UnterminatedValue),
    }
}

/// Appends one raw byte to a `String`, masking to ASCII. One input byte
/// always stores exactly one byte, so the capacity checks above bound the
/// stored length precisely. Protocol keys and values are ASCII.
fn push_byte(out: &mut String, byte: u8) {
    out.push(char::from(byte & 0x7F));
}
