// ndeftag/src/lib.rs

//! ndeftag
//!
//! NDEF tag-operation layer for the NFC Forum tag platforms: detect,
//! read, write, erase and format NDEF messages on Type 1 through Type 5
//! Tags and on MIFARE Classic cards carrying the NDEF MAD mapping. The
//! per-type protocol plumbing (framing, anticollision, authentication)
//! stays behind the [`transport::TagTransport`] trait; this crate owns
//! everything from the capability structures up.
#![warn(missing_docs)]

pub mod apdu;
pub mod config;
pub mod constants;
pub mod error;
pub mod prelude;
pub mod tag;
pub mod tlv;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export the common types at the crate root so `crate::Error`,
// `crate::Result` and the core types are available for consumers and
// for convenient `prelude` re-exports.
pub use crate::error::*;
pub use crate::types::*;

pub use prelude::*;
