// ndeftag/src/apdu/mod.rs
//! Minimal ISO7816-4 client codec used by the Type 4 Tag engine: command
//! builders with short and extended length encodings, response splitting,
//! the SW1SW2 mapping table and the BER-TLV ODO/DDO wrappers.

pub mod ber;
pub mod command;
pub mod response;
pub mod status;

pub use command::ApduCommand;
pub use response::ApduResponse;
