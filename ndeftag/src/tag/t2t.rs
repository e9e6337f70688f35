// ndeftag/src/tag/t2t.rs
//! Type 2 Tag (ISO14443-A, 4-byte blocks). The capability container sits
//! in block 3; the TLV data area starts at block 4. Tags above 1 KB are
//! split into sectors and every block access is routed through a guard
//! that issues the sector select on crossings.

use log::debug;

use crate::config::TagConfig;
use crate::constants::{
    CC_MAGIC, SUPPORTED_MAJOR_VERSION, T2T_BLOCK_SIZE, T2T_CC_ADDR, T2T_DATA_ADDR,
    T2T_SECTOR_SIZE, T2T_STATIC_LOCK_ADDR,
};
use crate::tag::area::TlvArea;
use crate::tag::Detection;
use crate::transport::{self, TagTransport};
use crate::types::{Access, TagState};
use crate::{Error, Result};

const BLOCKS_PER_SECTOR: u32 = (T2T_SECTOR_SIZE / T2T_BLOCK_SIZE) as u32;

/// Transport wrapper that tracks the active sector and selects a new one
/// before any block access that crosses the 1 KB boundary. Block numbers
/// stay absolute; the select only informs the transport.
struct SectorGuard<'a> {
    inner: &'a mut dyn TagTransport,
    current: Option<u8>,
}

impl<'a> SectorGuard<'a> {
    fn new(inner: &'a mut dyn TagTransport) -> Self {
        Self {
            inner,
            current: None,
        }
    }

    fn enter(&mut self, block: u32) -> Result<()> {
        let sector = (block / BLOCKS_PER_SECTOR) as u8;
        if self.current != Some(sector) {
            self.inner.select_sector(sector)?;
            self.current = Some(sector);
        }
        Ok(())
    }
}

impl TagTransport for SectorGuard<'_> {
    fn read_blocks(&mut self, start_block: u32, count: usize) -> Result<Vec<u8>> {
        let last = start_block + count.saturating_sub(1) as u32;
        if start_block / BLOCKS_PER_SECTOR == last / BLOCKS_PER_SECTOR {
            self.enter(start_block)?;
            return self.inner.read_blocks(start_block, count);
        }
        // Span crosses a sector boundary: fetch block by block
        let mut out = Vec::with_capacity(count * T2T_BLOCK_SIZE);
        for i in 0..count as u32 {
            self.enter(start_block + i)?;
            out.extend_from_slice(&self.inner.read_blocks(start_block + i, 1)?);
        }
        Ok(out)
    }

    fn write_blocks(&mut self, start_block: u32, data: &[u8]) -> Result<()> {
        for (i, chunk) in data.chunks(T2T_BLOCK_SIZE).enumerate() {
            self.enter(start_block + i as u32)?;
            self.inner.write_blocks(start_block + i as u32, chunk)?;
        }
        Ok(())
    }

    fn block_size(&self) -> usize {
        T2T_BLOCK_SIZE
    }
}

/// Per-detection Type 2 Tag session.
#[derive(Debug, Default)]
pub struct Type2Session {
    cc: [u8; 4],
    area: Option<TlvArea>,
}

impl Type2Session {
    fn area(&mut self) -> Result<&mut TlvArea> {
        self.area.as_mut().ok_or(Error::InvalidState)
    }

    /// Validate the capability container in block 3 and scan the data
    /// area for the NDEF TLV.
    pub fn check(&mut self, t: &mut dyn TagTransport, cfg: &mut TagConfig) -> Result<Detection> {
        *self = Self::default();
        let mut guard = SectorGuard::new(t);

        let raw = transport::read_span(&mut guard, T2T_CC_ADDR, 4)?;
        let cc: [u8; 4] = [raw[0], raw[1], raw[2], raw[3]];
        if cc[0] != CC_MAGIC {
            return Err(Error::NonNdefTag);
        }
        if cc[1] >> 4 != SUPPORTED_MAJOR_VERSION {
            return Err(Error::UnsupportedVersion(cc[1]));
        }
        let size = usize::from(cc[2]) * 8;
        if size == 0 {
            return Err(Error::MisconfiguredTag(
                "capability container advertises a zero-size data area".to_string(),
            ));
        }
        if Access::from_nibble(cc[3] >> 4)? == Access::Denied {
            return Err(Error::UnsupportedTag("read access denied".to_string()));
        }
        let writable = Access::from_nibble(cc[3] & 0x0F)? == Access::Granted;
        cfg.memory_size = size as u32;
        debug!("t2t cc: version {:#04x}, {} byte area", cc[1], size);

        let area = TlvArea::detect(&mut guard, T2T_DATA_ADDR, T2T_DATA_ADDR + size, &[])?;
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

    /// Read the detected message through the sector guard.
    pub fn read(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig) -> Result<Vec<u8>> {
        let area = self.area()?.clone();
        area.read(&mut SectorGuard::new(t), T2T_BLOCK_SIZE)
    }

    /// Replace the detected message.
    pub fn write(&mut self, t: &mut dyn TagTransport, cfg: &TagConfig, data: &[u8]) -> Result<()> {
        let terminator = cfg.terminator_tlv;
        self.area()?
            .write(&mut SectorGuard::new(t), data, terminator)
    }

    /// Zero the message length.
    pub fn erase(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig) -> Result<()> {
        self.area()?.erase(&mut SectorGuard::new(t))
    }

    /// Lay down a fresh capability container and an empty message on a
    /// blank tag. The area size comes from the configured memory size.
    pub fn format(&mut self, t: &mut dyn TagTransport, cfg: &TagConfig) -> Result<()> {
        let size = cfg.memory_size as usize;
        if size == 0 || size % 8 != 0 || size / 8 > 0xFF {
            return Err(Error::InvalidParameter(format!(
                "memory size {} is not a multiple of 8 below 2041",
                size
            )));
        }
        let mut guard = SectorGuard::new(t);
        let cc = [CC_MAGIC, 0x10, (size / 8) as u8, 0x00];
        transport::write_span(&mut guard, T2T_CC_ADDR, &cc)?;
        transport::write_span(&mut guard, T2T_DATA_ADDR, &crate::tag::area::format_tlvs())?;
        debug!("t2t formatted with a {} byte data area", size);
        Ok(())
    }

    /// Deny write access in the CC and blow the lock bits: the static
    /// lock bytes always, plus every range a Lock Control TLV announced.
    pub fn set_read_only(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig) -> Result<()> {
        let area = self.area()?.clone();
        let mut guard = SectorGuard::new(t);
        let mut cc = self.cc;
        cc[3] |= 0x0F;
        transport::write_span(&mut guard, T2T_CC_ADDR, &cc)?;
        transport::write_span(&mut guard, T2T_STATIC_LOCK_ADDR, &[0xFF, 0xFF])?;
        for lock in &area.locks {
            let (addr, len) = lock.lock_span();
            transport::write_span(&mut guard, addr, &vec![0xFF; len])?;
        }
        self.cc = cc;
        Ok(())
    }
}
