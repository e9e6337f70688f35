// ndeftag/src/prelude.rs

//! The commonly used surface of the crate in one import.

pub use crate::config::{ConfigKey, TagConfig};
pub use crate::tag::{Detection, TagContext};
pub use crate::transport::TagTransport;
pub use crate::{Error, Result, TagState, TagType};

// Re-export small utilities for convenience
pub use crate::utils::{bytes_to_hex, bytes_to_hex_spaced};
