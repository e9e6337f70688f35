// ndeftag/src/error.rs

use thiserror::Error;

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Detection found no NDEF structure on the tag
    #[error("tag does not contain an NDEF message")]
    NonNdefTag,

    /// The tag advertises a mapping major version this layer cannot drive
    #[error("unsupported mapping version: {0:#04x}")]
    UnsupportedVersion(u8),

    /// The tag's own management data is inconsistent
    #[error("misconfigured tag: {0}")]
    MisconfiguredTag(String),

    /// Valid but unsupported tag option, typically an RFU field value
    #[error("unsupported tag option: {0}")]
    UnsupportedTag(String),

    /// Format was requested on a tag already carrying an NDEF structure
    #[error("tag already carries a detected NDEF message")]
    FormattedTag,

    /// A data operation ran before a successful detection
    #[error("operation requires a prior successful NDEF detection")]
    InvalidState,

    /// Write or erase on a read-only tag
    #[error("tag is read-only")]
    ReadOnlyTag,

    /// Read on a tag whose message length is zero
    #[error("NDEF message is empty")]
    EmptyNdef,

    /// A message does not fit the available capacity
    #[error("buffer overflow: need {needed} bytes, capacity {capacity}")]
    BufferOverflow {
        /// Bytes the operation required
        needed: usize,
        /// Bytes actually available
        capacity: usize,
    },

    /// Caller-supplied argument out of range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A buffer was shorter or longer than the operation requires
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Length the operation requires
        expected: usize,
        /// Length actually seen
        actual: usize,
    },

    /// Status word outside the fixed mapping table
    #[error("apdu status: sw1sw2={0:#06x}")]
    ApduStatus(u16),

    /// Failure reported by the transport below this layer
    #[error("transport error: {0}")]
    Transport(String),

    /// The transport gave up waiting for the tag
    #[error("operation timed out")]
    Timeout,

    /// The transport or tag does not implement the requested operation
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
