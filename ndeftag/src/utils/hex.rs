// ndeftag/src/utils/hex.rs

//! Hex formatting for trace output. Wire bytes and tag images show up
//! in logs as lowercase hex, compact or space-separated.

use std::fmt::Write;

/// Format a byte slice as lowercase hex without separators.
///
/// Example: `&[0xde, 0xad]` -> `"dead"`
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(
        String::with_capacity(bytes.len() * 2),
        |mut s, b| {
            // write! never fails writing to a String
            let _ = write!(s, "{:02x}", b);
            s
        },
    )
}

/// Format a byte slice as lowercase hex with a space between bytes.
///
/// Example: `&[0xde, 0xad]` -> `"de ad"`
pub fn bytes_to_hex_spaced(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 3);
    for b in bytes {
        if !s.is_empty() {
            s.push(' ');
        }
        let _ = write!(s, "{:02x}", b);
    }
    s
}
