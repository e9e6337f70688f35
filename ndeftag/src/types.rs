// ndeftag/src/types.rs

use crate::Error;
use derive_more::Display;

/// NFC Forum tag platform handled by this layer.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TagType {
    /// Type 1 Tag (Topaz)
    #[display(fmt = "Type 1 Tag")]
    Type1,
    /// Type 2 Tag (ISO14443-A)
    #[display(fmt = "Type 2 Tag")]
    Type2,
    /// Type 3 Tag (FeliCa)
    #[display(fmt = "Type 3 Tag")]
    Type3,
    /// Type 4 Tag (ISO7816-4 file addressed)
    #[display(fmt = "Type 4 Tag")]
    Type4,
    /// Type 5 Tag (ISO15693)
    #[display(fmt = "Type 5 Tag")]
    Type5,
    /// MIFARE Classic carrying NDEF via the application directory
    #[display(fmt = "MIFARE Classic NDEF")]
    MifareClassic,
}

impl TagType {
    /// Fixed block size of the tag platform, where one exists. Type 4 Tag
    /// is file-addressed and Type 5 Tag advertises its own block size, so
    /// both return `None`.
    pub fn block_size(&self) -> Option<usize> {
        match self {
            Self::Type1 => Some(crate::constants::T1T_BLOCK_SIZE),
            Self::Type2 => Some(crate::constants::T2T_BLOCK_SIZE),
            Self::Type3 => Some(crate::constants::T3T_BLOCK_SIZE),
            Self::Type4 => None,
            Self::Type5 => None,
            Self::MifareClassic => Some(crate::constants::MFC_BLOCK_SIZE),
        }
    }
}

/// Detection state of the active tag.
///
/// `None → Initialized → ReadWrite → ReadOnly`, with `ReadWrite →
/// Initialized` via erase. `ReadOnly` is terminal for the session.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TagState {
    /// No successful detection yet
    #[default]
    #[display(fmt = "none")]
    None,
    /// NDEF-capable, message length zero
    #[display(fmt = "initialized")]
    Initialized,
    /// NDEF message present, write access granted
    #[display(fmt = "read/write")]
    ReadWrite,
    /// NDEF message present, write access denied
    #[display(fmt = "read-only")]
    ReadOnly,
}

impl TagState {
    /// Whether the five data operations may run against this state.
    pub fn is_detected(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Location of the NDEF TLV inside the tag's data area, computed once per
/// detection and reused by read/write/erase so the area is not re-scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdefLocation {
    /// Absolute byte address of the TLV tag byte
    pub header_addr: usize,
    /// Absolute byte address of the first message byte (after the length
    /// field)
    pub message_addr: usize,
    /// Message length in bytes (the TLV L value)
    pub length: usize,
    /// Width of the length field: 1, or 3 for the 0xFF-escaped form
    pub len_width: u8,
}

impl NdefLocation {
    /// Length-field width needed to encode `len`.
    pub fn width_for(len: usize) -> u8 {
        if len < crate::constants::TLV_LEN_ESCAPE as usize {
            1
        } else {
            3
        }
    }
}

/// Decoded Lock Control TLV (Type 1/2/5 dynamic memory layouts).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockControlTlv {
    /// Byte offset of the TLV itself within the data area
    pub tlv_offset: usize,
    /// Absolute byte address of the first lock byte
    pub lock_addr: usize,
    /// Number of lock bits (0 was decoded as 256)
    pub size_bits: usize,
    /// Bytes per page, already expanded from the power-of-two exponent
    pub bytes_per_page: usize,
    /// Bytes covered by one lock bit, expanded likewise
    pub bytes_locked_per_bit: usize,
}

/// Decoded Memory Control TLV (reserved area of a dynamic layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryControlTlv {
    /// Byte offset of the TLV itself within the data area
    pub tlv_offset: usize,
    /// Absolute byte address of the reserved area
    pub rsvd_addr: usize,
    /// Reserved area size in bytes (0 was decoded as 256)
    pub size_bytes: usize,
    /// Bytes per page, expanded from the exponent
    pub bytes_per_page: usize,
}

/// Read/write access condition decoded from a Capability Container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Access nibble 0x0
    Granted,
    /// Access nibble 0xF
    Denied,
}

impl Access {
    /// Decode a 4-bit CC access nibble. `0x0` grants, `0xF` denies,
    /// anything else is reserved for future use.
    pub fn from_nibble(nibble: u8) -> crate::Result<Self> {
        match nibble {
            0x0 => Ok(Self::Granted),
            0xF => Ok(Self::Denied),
            other => Err(Error::UnsupportedTag(format!(
                "rfu access nibble {:#03x}",
                other
            ))),
        }
    }
}
