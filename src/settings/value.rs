//! Typed Setting Slots
//!
//! Every setting owns exactly one [`SettingValue`] slot. The variant and
//! its capacity/length are fixed when the registry is built and never
//! change at runtime; writes mutate the slot in place after a type check.
//!
//! The tagged union replaces the classic firmware pattern of a `void*`
//! plus a side-channel type tag. All the invariants that used to live in
//! programmer discipline (string capacity, array length, type agreement)
//! are enforced here:
//!
//! - `Str` slots truncate to `capacity - 1` bytes on write, on a char
//!   boundary, mirroring a null-terminated fixed buffer
//! - `FloatArray` slots accept exactly their declared length, never fewer
//!   or more elements
//! - scalar slots reject any input of the wrong shape

use crate::protocol::types::{ValueInput, WireValue};
use thiserror::Error;

/// Maximum declared length of a float-array slot.
pub const MAX_FLOAT_VECTOR_LEN: usize = 9;

/// Errors from writing a setting slot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingError {
    /// The input's shape does not match the slot's type
    #[error("type mismatch writing '{key}'")]
    TypeMismatch { key: String },

    /// A float-array write supplied the wrong number of elements
    #[error("'{key}' expects exactly {expected} elements, got {got}")]
    ArityMismatch {
        key: String,
        expected: usize,
        got: usize,
    },

    /// The setting is write-protected outside factory mode
    #[error("'{key}' is read-only")]
    ReadOnly { key: String },
}

/// A string slot with a fixed byte capacity.
///
/// Writes keep at most `capacity - 1` bytes, the layout a fixed
/// `char[capacity]` buffer with a terminating NUL would hold.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedString {
    text: String,
    capacity: usize,
}

impl BoundedString {
    /// Creates a slot with the given capacity and initial text.
    /// The initial text is subject to the same truncation as writes.
    pub fn new(capacity: usize, initial: &str) -> Self {
        debug_assert!(capacity > 0);
        let mut s = Self {
            text: String::new(),
            capacity,
        };
        s.assign(initial);
        s
    }

    /// Overwrites the stored text, truncating to `capacity - 1` bytes on
    /// a character boundary.
    pub fn assign(&mut self, value: &str) {
        let limit = self.capacity.saturating_sub(1);
        if value.len() <= limit {
            self.text.clear();
            self.text.push_str(value);
        } else {
            let mut cut = limit;
            while cut > 0 && !value.is_char_boundary(cut) {
                cut -= 1;
            }
            self.text.clear();
            self.text.push_str(&value[..cut]);
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A float-array slot with a fixed declared length.
///
/// The backing storage is always [`MAX_FLOAT_VECTOR_LEN`] wide; only the
/// first `len` elements are meaningful and `len` never changes after
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatVector {
    values: [f32; MAX_FLOAT_VECTOR_LEN],
    len: usize,
}

impl FloatVector {
    /// Creates a slot from its initial contents; the slice length becomes
    /// the fixed declared length.
    pub fn new(initial: &[f32]) -> Self {
        assert!(initial.len() <= MAX_FLOAT_VECTOR_LEN);
        let mut values = [0.0; MAX_FLOAT_VECTOR_LEN];
        values[..initial.len()].copy_from_slice(initial);
        Self {
            values,
            len: initial.len(),
        }
    }

    /// Overwrites the contents. The input must supply exactly `len`
    /// elements; returns `false` (and leaves the slot untouched) if not.
    pub fn assign(&mut self, input: &[f32]) -> bool {
        if input.len() != self.len {
            return false;
        }
        self.values[..self.len].copy_from_slice(input);
        true
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// One typed setting slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Byte(u8),
    Float(f32),
    Int(i32),
    Str(BoundedString),
    FloatArray(FloatVector),
}

impl SettingValue {
    /// Projects the slot into a serializable wire value.
    pub fn to_wire(&self) -> WireValue {
        match self {
            SettingValue::Bool(v) => WireValue::Bool(*v),
            SettingValue::Byte(v) => WireValue::Byte(*v),
            SettingValue::Float(v) => WireValue::Float(*v),
            SettingValue::Int(v) => WireValue::Int(*v),
            SettingValue::Str(s) => WireValue::Str(s.as_str().to_string()),
            SettingValue::FloatArray(a) => WireValue::FloatArray(a.as_slice().to_vec()),
        }
    }

    /// Type-checks `input` against this slot and applies it in place.
    ///
    /// A failed write leaves the slot exactly as it was.
    pub fn apply(&mut self, input: &ValueInput, key: &str) -> Result<(), SettingError> {
        match (self, input) {
            (SettingValue::Bool(slot), ValueInput::Bool(v)) => {
                *slot = *v;
                Ok(())
            }
            (SettingValue::Byte(slot), ValueInput::Number(n)) => {
                if n.fract() == 0.0 && (0.0..=255.0).contains(n) {
                    *slot = *n as u8;
                    Ok(())
                } else {
                    Err(SettingError::TypeMismatch {
                        key: key.to_string(),
                    })
                }
            }
            (SettingValue::Float(slot), ValueInput::Number(n)) => {
                *slot = *n as f32;
                Ok(())
            }
            (SettingValue::Int(slot), ValueInput::Number(n)) => {
                if n.fract() == 0.0 && (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(n) {
                    *slot = *n as i32;
                    Ok(())
                } else {
                    Err(SettingError::TypeMismatch {
                        key: key.to_string(),
                    })
                }
            }
            (SettingValue::Str(slot), ValueInput::Text(t)) => {
                slot.assign(t);
                Ok(())
            }
            (SettingValue::FloatArray(slot), ValueInput::Array(values)) => {
                if slot.assign(values) {
                    Ok(())
                } else {
                    Err(SettingError::ArityMismatch {
                        key: key.to_string(),
                        expected: slot.len(),
                        got: values.len(),
                    })
                }
            }
            _ => Err(SettingError::TypeMismatch {
                key: key.to_string(),
            }),
        }
    }
}
