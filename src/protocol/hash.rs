//! Key Hashing
//!
//! Every command key is resolved by a 32-bit djb2 hash rather than by string
//! comparison. The settings table stores the hash of each setting name, and
//! the fixed command verbs are matched against hash constants that are
//! computed at compile time from the verb strings themselves.
//!
//! Computing the constants with a `const fn` (instead of baking in literal
//! values) means the table can never drift out of sync with the hash
//! function, and the hash width is pinned to `u32` on every target.

/// Hashes a key with the djb2 function over 32-bit wrapping arithmetic.
///
/// The recurrence is `h = 5381; h = (h << 5) + h + byte` for every byte of
/// the input. The empty string hashes to 5381.
///
/// # Example
///
/// ```
/// use imulink::protocol::djb2;
///
/// assert_eq!(djb2("deviceName"), 0x2621_0236);
/// ```
pub const fn djb2(key: &str) -> u32 {
    let bytes = key.as_bytes();
    let mut hash: u32 = 5381;
    let mut i = 0;
    while i < bytes.len() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_add(hash)
            .wrapping_add(bytes[i] as u32);
        i += 1;
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        // Values fixed by the legacy command table.
        assert_eq!(djb2("deviceName"), 0x2621_0236);
        assert_eq!(djb2("ping"), 0x7C9C_4733);
        assert_eq!(djb2("serialNumber"), 0x4440_862E);
        assert_eq!(djb2("save"), 0x7C9D_CB54);
        assert_eq!(djb2("shutdown"), 0xFC46_0361);
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(djb2(""), 5381);
    }

    #[test]
    fn test_deterministic() {
        for key in ["ahrsGain", "udpReceivePort", "x", "0123456789"] {
            assert_eq!(djb2(key), djb2(key));
        }
    }

    #[test]
    fn test_case_sensitive() {
        assert_ne!(djb2("deviceName"), djb2("devicename"));
    }

    #[test]
    fn test_wraps_on_long_input() {
        // Long inputs must wrap modulo 2^32 rather than overflow.
        let long = "a".repeat(1024);
        let h = djb2(&long);
        assert_eq!(h, djb2(&long));
    }

    #[test]
    fn test_usable_in_const_context() {
        const SAVE: u32 = djb2("save");
        assert_eq!(SAVE, 0x7C9D_CB54);
    }
}
