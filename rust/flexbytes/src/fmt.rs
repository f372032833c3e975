//! Textual rendering of byte ranges.

use std::fmt::Write;

/// Renders bytes as `0x`-prefixed lowercase hex, e.g. `[1, 7, 10, 33]`
/// becomes `"0x01070a21"`. An empty slice renders as `"0x"`.
pub fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for byte in bytes {
        // Writing to a String cannot fail.
        let _ = write!(out, "{byte:02x}");
    }
    out
}
