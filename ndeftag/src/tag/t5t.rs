// ndeftag/src/tag/t5t.rs
//! Type 5 Tag (ISO15693). The capability container occupies the first 4
//! bytes, or 8 when the data area is too large for the single-byte MLEN
//! field. The 0xE2 magic selects 2-byte block addressing on the wire; at
//! this layer both variants resolve block numbers the same way, from the
//! byte address and the block size the transport reports.

use log::debug;

use crate::config::TagConfig;
use crate::constants::{
    CC_MAGIC, CC_MAGIC_EXTENDED, SUPPORTED_MAJOR_VERSION, T5T_FLAG_LOCK_BLOCK, T5T_FLAG_MBREAD,
};
use crate::tag::area::TlvArea;
use crate::tag::Detection;
use crate::transport::{self, TagTransport};
use crate::types::TagState;
use crate::{Error, Result};

fn access_bits(bits: u8, what: &str) -> Result<bool> {
    match bits {
        0b00 => Ok(true),
        0b11 => Ok(false),
        other => Err(Error::UnsupportedTag(format!(
            "rfu {} access bits {:#04b}",
            what, other
        ))),
    }
}

/// Per-detection Type 5 Tag session.
#[derive(Debug, Default)]
pub struct Type5Session {
    cc: Vec<u8>,
    area: Option<TlvArea>,
    extended_addressing: bool,
    lock_capable: bool,
}

impl Type5Session {
    fn area(&mut self) -> Result<&mut TlvArea> {
        self.area.as_mut().ok_or(Error::InvalidState)
    }

    /// Validate the 4- or 8-byte capability container and scan the data
    /// area for the NDEF TLV.
    pub fn check(&mut self, t: &mut dyn TagTransport, cfg: &mut TagConfig) -> Result<Detection> {
        *self = Self::default();
        let bs = t.block_size();
        if bs == 0 {
            return Err(Error::InvalidParameter(
                "transport reports a zero block size".to_string(),
            ));
        }

        let mut cc = transport::read_span(t, 0, 4)?;
        let extended_addressing = match cc[0] {
            CC_MAGIC => false,
            CC_MAGIC_EXTENDED => true,
            _ => return Err(Error::NonNdefTag),
        };
        if cc[1] >> 6 != SUPPORTED_MAJOR_VERSION {
            return Err(Error::UnsupportedVersion(cc[1]));
        }
        if !access_bits((cc[1] >> 2) & 0b11, "read")? {
            return Err(Error::UnsupportedTag("read access denied".to_string()));
        }
        let writable = access_bits(cc[1] & 0b11, "write")?;

        // MLEN of zero selects the 8-byte CC with a 16-bit MLEN behind it
        let (cc_len, area_size) = if cc[2] == 0 {
            cc = transport::read_span(t, 0, 8)?;
            let mlen = usize::from(cc[6]) << 8 | usize::from(cc[7]);
            if mlen == 0 {
                return Err(Error::MisconfiguredTag(
                    "both mlen fields are zero".to_string(),
                ));
            }
            (8, mlen * 8)
        } else {
            (4, usize::from(cc[2]) * 8)
        };
        let flags = cc[3];
        cfg.multi_block_read = flags & T5T_FLAG_MBREAD != 0;
        cfg.lock_block_support = flags & T5T_FLAG_LOCK_BLOCK != 0;
        cfg.memory_size = area_size as u32;
        debug!(
            "t5t cc: {} bytes, {} byte area, flags {:#04x}, extended addressing {}",
            cc_len, area_size, flags, extended_addressing
        );

        let area = TlvArea::detect(t, cc_len, cc_len + area_size, &[])?;
        let loc = area.ndef.ok_or(Error::NonNdefTag)?;
        area.check_length()?;

        let state = if !writable {
            TagState::ReadOnly
        } else if loc.length == 0 {
            TagState::Initialized
        } else {
            TagState::ReadWrite
        };
        let max_ndef_len = area.capacity();
        let version = cc[1];
        self.cc = cc;
        self.area = Some(area);
        self.extended_addressing = extended_addressing;
        self.lock_capable = flags & T5T_FLAG_LOCK_BLOCK != 0;
        Ok(Detection {
            state,
            version,
            ndef_len: loc.length,
            max_ndef_len,
        })
    }

    /// Read the detected message.
    pub fn read(&mut self, t: &mut dyn TagTransport, cfg: &TagConfig) -> Result<Vec<u8>> {
        // Multi-block reads batch up to the configured chunk; without the
        // CC feature flag every fetch stays a single block.
        let chunk = if cfg.multi_block_read {
            cfg.max_read_len as usize
        } else {
            t.block_size()
        };
        self.area()?.clone().read(t, chunk)
    }

    /// Replace the detected message.
    pub fn write(&mut self, t: &mut dyn TagTransport, cfg: &TagConfig, data: &[u8]) -> Result<()> {
        let terminator = cfg.terminator_tlv;
        self.area()?.write(t, data, terminator)
    }

    /// Zero the message length.
    pub fn erase(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig) -> Result<()> {
        self.area()?.erase(t)
    }

    /// Lay down a fresh CC and an empty message on a blank tag, sized
    /// from the configured memory size and feature flags.
    pub fn format(&mut self, t: &mut dyn TagTransport, cfg: &TagConfig) -> Result<()> {
        let size = cfg.memory_size as usize;
        if size == 0 || size % 8 != 0 {
            return Err(Error::InvalidParameter(format!(
                "memory size {} is not a multiple of 8",
                size
            )));
        }
        let mut flags = 0u8;
        if cfg.multi_block_read {
            flags |= T5T_FLAG_MBREAD;
        }
        if cfg.lock_block_support {
            flags |= T5T_FLAG_LOCK_BLOCK;
        }
        // Version 1.0, read and write granted
        let version = 0x40;
        let cc_len = if size / 8 <= 0xFF {
            transport::write_span(t, 0, &[CC_MAGIC, version, (size / 8) as u8, flags])?;
            4
        } else {
            let mlen = (size / 8) as u16;
            let mut cc = vec![CC_MAGIC_EXTENDED, version, 0x00, flags, 0, 0, 0, 0];
            cc[6..8].copy_from_slice(&mlen.to_be_bytes());
            transport::write_span(t, 0, &cc)?;
            8
        };
        transport::write_span(t, cc_len, &crate::tag::area::format_tlvs())?;
        debug!("t5t formatted with a {} byte area, {} byte cc", size, cc_len);
        Ok(())
    }

    /// Deny write access in the CC, then lock every block of the CC and
    /// data area when the tag supports the lock command.
    pub fn set_read_only(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig) -> Result<()> {
        let area = self.area()?.clone();
        let mut cc = self.cc.clone();
        cc[1] |= 0b11;
        transport::write_span(t, 1, &cc[1..2])?;
        if self.lock_capable {
            let bs = t.block_size();
            let last_block = (area.end - 1) / bs;
            for block in 0..=last_block as u32 {
                t.lock_block(block)?;
            }
        }
        self.cc = cc;
        Ok(())
    }

    /// Permanently lock a single block. Only honored when the CC
    /// advertised lock-block support.
    pub fn lock_block(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig, block: u32) -> Result<()> {
        if self.area.is_none() {
            return Err(Error::InvalidState);
        }
        if !self.lock_capable {
            return Err(Error::UnsupportedOperation(
                "tag does not advertise lock-block support".to_string(),
            ));
        }
        t.lock_block(block)
    }
}
