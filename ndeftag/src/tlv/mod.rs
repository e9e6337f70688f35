// ndeftag/src/tlv/mod.rs
//! Shared TLV machinery for the block-addressed tag types: the chunked
//! scanner that locates the NDEF TLV and the Lock/Memory-Control decoding
//! that yields the reserved-byte skip map.

pub mod control;
pub mod scanner;

pub use control::{SkipMap, decode_lock_control, decode_memory_control};
pub use scanner::{ScanReport, scan};

use crate::{Error, Result};

/// Ensure the slice has at least `min` bytes.
pub fn ensure_len(data: &[u8], min: usize) -> Result<()> {
    if data.len() < min {
        return Err(Error::InvalidLength {
            expected: min,
            actual: data.len(),
        });
    }
    Ok(())
}
