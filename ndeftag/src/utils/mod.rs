// ndeftag/src/utils/mod.rs

//! Small helpers shared across the crate.

pub mod hex;

pub use hex::{bytes_to_hex, bytes_to_hex_spaced};
