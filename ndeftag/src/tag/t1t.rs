// ndeftag/src/tag/t1t.rs
//! Type 1 Tag (Topaz, 8-byte blocks). Block 0 carries the UID, block 1
//! the capability container, and the TLV data area runs from byte 12.
//! Blocks 0x0D and 0x0E hold reserved and lock/OTP bytes and are never
//! part of the data stream, whether or not a control TLV mentions them.

use log::debug;

use crate::config::TagConfig;
use crate::constants::{
    CC_MAGIC, SUPPORTED_MAJOR_VERSION, T1T_CC_ADDR, T1T_DATA_ADDR, T1T_RESERVED_ADDR,
    T1T_RESERVED_LEN, T1T_STATIC_LOCK_ADDR,
};
use crate::tag::area::TlvArea;
use crate::tag::Detection;
use crate::transport::{self, TagTransport};
use crate::types::{Access, TagState};
use crate::{Error, Result};

/// Per-detection Type 1 Tag session.
#[derive(Debug, Default)]
pub struct Type1Session {
    cc: [u8; 4],
    area: Option<TlvArea>,
}

impl Type1Session {
    fn area(&mut self) -> Result<&mut TlvArea> {
        self.area.as_mut().ok_or(Error::InvalidState)
    }

    fn fixed_skip(total: usize) -> Vec<(usize, usize)> {
        if total > T1T_RESERVED_ADDR {
            let len = T1T_RESERVED_LEN.min(total - T1T_RESERVED_ADDR);
            vec![(T1T_RESERVED_ADDR, len)]
        } else {
            Vec::new()
        }
    }

    /// Validate the capability container in block 1 and scan the data
    /// area for the NDEF TLV.
    pub fn check(&mut self, t: &mut dyn TagTransport, cfg: &mut TagConfig) -> Result<Detection> {
        *self = Self::default();

        let raw = transport::read_span(t, T1T_CC_ADDR, 4)?;
        let cc: [u8; 4] = [raw[0], raw[1], raw[2], raw[3]];
        if cc[0] != CC_MAGIC {
            return Err(Error::NonNdefTag);
        }
        if cc[1] >> 4 != SUPPORTED_MAJOR_VERSION {
            return Err(Error::UnsupportedVersion(cc[1]));
        }
        // TMS encodes total memory as (TMS + 1) * 8 bytes
        let total = (usize::from(cc[2]) + 1) * 8;
        if total <= T1T_DATA_ADDR {
            return Err(Error::MisconfiguredTag(format!(
                "tag memory size {} leaves no data area",
                total
            )));
        }
        if Access::from_nibble(cc[3] >> 4)? == Access::Denied {
            return Err(Error::UnsupportedTag("read access denied".to_string()));
        }
        let writable = Access::from_nibble(cc[3] & 0x0F)? == Access::Granted;
        cfg.memory_size = total as u32;
        debug!("t1t cc: version {:#04x}, {} bytes total", cc[1], total);

        let area = TlvArea::detect(t, T1T_DATA_ADDR, total, &Self::fixed_skip(total))?;
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
        self.cc = cc;
        self.area = Some(area);
        Ok(Detection {
            state,
            version: cc[1],
            ndef_len: loc.length,
            max_ndef_len,
        })
    }

    /// Read the detected message.
    pub fn read(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig) -> Result<Vec<u8>> {
        let bs = t.block_size();
        self.area()?.clone().read(t, bs)
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
    /// from the configured memory size.
    pub fn format(&mut self, t: &mut dyn TagTransport, cfg: &TagConfig) -> Result<()> {
        let total = cfg.memory_size as usize;
        if total <= T1T_DATA_ADDR || total % 8 != 0 || total / 8 > 0x100 {
            return Err(Error::InvalidParameter(format!(
                "memory size {} is not a valid t1t capacity",
                total
            )));
        }
        let cc = [CC_MAGIC, 0x10, (total / 8 - 1) as u8, 0x00];
        transport::write_span(t, T1T_CC_ADDR, &cc)?;
        transport::write_span(t, T1T_DATA_ADDR, &crate::tag::area::format_tlvs())?;
        debug!("t1t formatted with {} bytes total", total);
        Ok(())
    }

    /// Deny write access in the CC and blow the static lock bytes plus
    /// every Lock Control TLV range.
    pub fn set_read_only(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig) -> Result<()> {
        let area = self.area()?.clone();
        let mut cc = self.cc;
        cc[3] |= 0x0F;
        transport::write_span(t, T1T_CC_ADDR, &cc)?;
        transport::write_span(t, T1T_STATIC_LOCK_ADDR, &[0xFF, 0xFF])?;
        for lock in &area.locks {
            let (addr, len) = lock.lock_span();
            transport::write_span(t, addr, &vec![0xFF; len])?;
        }
        self.cc = cc;
        Ok(())
    }
}
