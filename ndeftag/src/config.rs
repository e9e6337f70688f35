// ndeftag/src/config.rs
//! Per-type tunables consulted by format/read/write.
//!
//! Detection overwrites most of these with what the tag's Capability
//! Container actually advertises; the configured values are the starting
//! point for blank tags (format) and for transports with known limits.

use crate::{Error, Result};

/// Keys accepted by [`crate::tag::TagContext::set_config`] and
/// [`crate::tag::TagContext::get_config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConfigKey {
    /// Data area size in bytes (Type 1/2/5), or NmaxB*16 for Type 3
    MemorySize,
    /// Type 4 NDEF file identifier
    NdefFileId,
    /// Type 4 NDEF file size used when formatting
    MaxFileSize,
    /// Maximum response data length for Type 4 exchanges
    Mle,
    /// Maximum command data length for Type 4 exchanges
    Mlc,
    /// Non-zero selects extended-length APDU encoding
    ExtendedApdu,
    /// Non-zero allows multi-block read commands (Type 5)
    MultiBlockRead,
    /// Non-zero advertises per-block lock command support (Type 5)
    LockBlockSupport,
    /// Non-zero appends a Terminator TLV after written messages
    TerminatorTlv,
    /// Largest chunk transferred per block read (Type 5)
    MaxReadLength,
    /// Write-once: setting a non-zero value transitions the tag to
    /// read-only. Reading reports the current state.
    ReadOnly,
}

/// Tunables for the active tag type.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagConfig {
    /// Data area size in bytes
    pub memory_size: u32,
    /// Type 4 NDEF file identifier
    pub ndef_file_id: u16,
    /// Type 4 NDEF file size used when formatting
    pub max_file_size: u32,
    /// Maximum response data length for Type 4 exchanges
    pub mle: u16,
    /// Maximum command data length for Type 4 exchanges
    pub mlc: u16,
    /// Use extended-length APDU encoding
    pub extended_apdu: bool,
    /// Multi-block read commands allowed (Type 5)
    pub multi_block_read: bool,
    /// Per-block lock command advertised (Type 5)
    pub lock_block_support: bool,
    /// Append a Terminator TLV after written messages
    pub terminator_tlv: bool,
    /// Largest chunk transferred per block read (Type 5)
    pub max_read_len: u32,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            memory_size: 64,
            ndef_file_id: crate::constants::DEFAULT_NDEF_FILE_ID,
            max_file_size: 0x0400,
            mle: 0x00FF,
            mlc: 0x00FF,
            extended_apdu: false,
            multi_block_read: false,
            lock_block_support: false,
            terminator_tlv: true,
            max_read_len: 253,
        }
    }
}

impl TagConfig {
    /// Store a tunable. `ConfigKey::ReadOnly` is not a tunable and is
    /// routed by the dispatch layer instead.
    pub fn set(&mut self, key: ConfigKey, value: u32) -> Result<()> {
        match key {
            ConfigKey::MemorySize => self.memory_size = value,
            ConfigKey::NdefFileId => {
                self.ndef_file_id = u16::try_from(value).map_err(|_| {
                    Error::InvalidParameter(format!("file id {:#x} out of range", value))
                })?
            }
            ConfigKey::MaxFileSize => self.max_file_size = value,
            ConfigKey::Mle => {
                self.mle = u16::try_from(value).map_err(|_| {
                    Error::InvalidParameter(format!("mle {:#x} out of range", value))
                })?
            }
            ConfigKey::Mlc => {
                self.mlc = u16::try_from(value).map_err(|_| {
                    Error::InvalidParameter(format!("mlc {:#x} out of range", value))
                })?
            }
            ConfigKey::ExtendedApdu => self.extended_apdu = value != 0,
            ConfigKey::MultiBlockRead => self.multi_block_read = value != 0,
            ConfigKey::LockBlockSupport => self.lock_block_support = value != 0,
            ConfigKey::TerminatorTlv => self.terminator_tlv = value != 0,
            ConfigKey::MaxReadLength => {
                if value == 0 {
                    return Err(Error::InvalidParameter(
                        "max read length must be non-zero".to_string(),
                    ));
                }
                self.max_read_len = value;
            }
            ConfigKey::ReadOnly => {
                return Err(Error::InvalidParameter(
                    "read-only is routed through the tag context".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Fetch a tunable as its raw `u32` value.
    pub fn get(&self, key: ConfigKey) -> Result<u32> {
        Ok(match key {
            ConfigKey::MemorySize => self.memory_size,
            ConfigKey::NdefFileId => u32::from(self.ndef_file_id),
            ConfigKey::MaxFileSize => self.max_file_size,
            ConfigKey::Mle => u32::from(self.mle),
            ConfigKey::Mlc => u32::from(self.mlc),
            ConfigKey::ExtendedApdu => u32::from(self.extended_apdu),
            ConfigKey::MultiBlockRead => u32::from(self.multi_block_read),
            ConfigKey::LockBlockSupport => u32::from(self.lock_block_support),
            ConfigKey::TerminatorTlv => u32::from(self.terminator_tlv),
            ConfigKey::MaxReadLength => self.max_read_len,
            ConfigKey::ReadOnly => {
                return Err(Error::InvalidParameter(
                    "read-only is routed through the tag context".to_string(),
                ));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_roundtrip() {
        let mut cfg = TagConfig::default();
        cfg.set(ConfigKey::MemorySize, 2048).unwrap();
        cfg.set(ConfigKey::Mle, 0x0F).unwrap();
        cfg.set(ConfigKey::ExtendedApdu, 1).unwrap();
        assert_eq!(cfg.get(ConfigKey::MemorySize).unwrap(), 2048);
        assert_eq!(cfg.get(ConfigKey::Mle).unwrap(), 0x0F);
        assert_eq!(cfg.get(ConfigKey::ExtendedApdu).unwrap(), 1);
    }

    #[test]
    fn narrow_keys_reject_wide_values() {
        let mut cfg = TagConfig::default();
        assert!(cfg.set(ConfigKey::Mle, 0x1_0000).is_err());
        assert!(cfg.set(ConfigKey::NdefFileId, 0x1_0000).is_err());
    }

    #[test]
    fn zero_max_read_length_rejected() {
        let mut cfg = TagConfig::default();
        assert!(matches!(
            cfg.set(ConfigKey::MaxReadLength, 0),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn read_only_not_a_tunable() {
        let mut cfg = TagConfig::default();
        assert!(cfg.set(ConfigKey::ReadOnly, 1).is_err());
        assert!(cfg.get(ConfigKey::ReadOnly).is_err());
    }
}
