// ndeftag/src/tag/mfc.rs
//! MIFARE Classic NDEF mapping. The MIFARE Application Directory in
//! sector 0 names the sectors assigned to NDEF (AID 0x03E1); their data
//! blocks, trailers excluded, concatenate into one logical byte space
//! that carries the same TLV stream as a Type 2 Tag. Authentication is
//! the transport's concern; this layer only translates logical block
//! numbers to physical ones.
//!
//! Only MAD version 1 (sectors 1-15 of a 1K layout) is handled here.

use log::debug;

use crate::config::TagConfig;
use crate::constants::{MAD_NDEF_AID, MFC_BLOCK_SIZE};
use crate::tag::area::TlvArea;
use crate::tag::Detection;
use crate::transport::{self, TagTransport};
use crate::types::TagState;
use crate::{Error, Result};

/// Data blocks per sector, the trailer excluded.
const DATA_BLOCKS_PER_SECTOR: u32 = 3;
/// Sector 0 trailer GPB bit announcing a MIFARE Application Directory.
const GPB_MAD_PRESENT: u8 = 0x80;
/// Byte offset of the general purpose byte within a sector trailer.
const TRAILER_GPB_OFFSET: usize = 9;

/// MAD CRC-8: polynomial 0x1D, preset 0xC7, over the info byte and the
/// fifteen AID pairs.
pub fn mad_crc(data: &[u8]) -> u8 {
    let mut crc = 0xC7u8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ 0x1D;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

fn trailer_block(sector: u8) -> u32 {
    u32::from(sector) * 4 + 3
}

/// Adapter presenting the NDEF sectors' data blocks as one contiguous
/// block space, so the shared TLV engine runs unchanged on top.
struct MfcSpace<'a> {
    inner: &'a mut dyn TagTransport,
    sectors: &'a [u8],
}

impl MfcSpace<'_> {
    fn physical(&self, logical: u32) -> Result<u32> {
        let sector_idx = (logical / DATA_BLOCKS_PER_SECTOR) as usize;
        let sector = *self.sectors.get(sector_idx).ok_or_else(|| {
            Error::Transport(format!(
                "logical block {} beyond the {} mapped sectors",
                logical,
                self.sectors.len()
            ))
        })?;
        Ok(u32::from(sector) * 4 + logical % DATA_BLOCKS_PER_SECTOR)
    }
}

impl TagTransport for MfcSpace<'_> {
    fn read_blocks(&mut self, start_block: u32, count: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(count * MFC_BLOCK_SIZE);
        for i in 0..count as u32 {
            let phys = self.physical(start_block + i)?;
            out.extend_from_slice(&self.inner.read_blocks(phys, 1)?);
        }
        Ok(out)
    }

    fn write_blocks(&mut self, start_block: u32, data: &[u8]) -> Result<()> {
        if data.is_empty() || data.len() % MFC_BLOCK_SIZE != 0 {
            return Err(Error::InvalidLength {
                expected: MFC_BLOCK_SIZE,
                actual: data.len(),
            });
        }
        for (i, chunk) in data.chunks(MFC_BLOCK_SIZE).enumerate() {
            let phys = self.physical(start_block + i as u32)?;
            self.inner.write_blocks(phys, chunk)?;
        }
        Ok(())
    }

    fn block_size(&self) -> usize {
        MFC_BLOCK_SIZE
    }
}

/// Per-detection MIFARE Classic session.
#[derive(Debug, Default)]
pub struct MifareSession {
    sectors: Vec<u8>,
    area: Option<TlvArea>,
    gpb: u8,
}

impl MifareSession {
    /// Read and validate the MAD, returning the NDEF sector list.
    fn discover_sectors(t: &mut dyn TagTransport) -> Result<Vec<u8>> {
        let trailer = t.read_blocks(trailer_block(0), 1)?;
        crate::tlv::ensure_len(&trailer, MFC_BLOCK_SIZE)?;
        if trailer[TRAILER_GPB_OFFSET] & GPB_MAD_PRESENT == 0 {
            return Err(Error::NonNdefTag);
        }

        let mut mad = t.read_blocks(1, 1)?;
        mad.extend_from_slice(&t.read_blocks(2, 1)?);
        crate::tlv::ensure_len(&mad, 32)?;
        if mad_crc(&mad[1..32]) != mad[0] {
            return Err(Error::MisconfiguredTag(
                "mad crc does not verify".to_string(),
            ));
        }

        // AID pairs are stored application code first: 0x03E1 is `03 E1`
        let aid = [(MAD_NDEF_AID >> 8) as u8, MAD_NDEF_AID as u8];
        let sectors: Vec<u8> = (1u8..16)
            .filter(|&s| mad[usize::from(s) * 2..usize::from(s) * 2 + 2] == aid)
            .collect();
        if sectors.is_empty() {
            return Err(Error::NonNdefTag);
        }
        Ok(sectors)
    }

    fn area(&mut self) -> Result<&mut TlvArea> {
        self.area.as_mut().ok_or(Error::InvalidState)
    }

    fn space<'a>(&'a self, t: &'a mut dyn TagTransport) -> MfcSpace<'a> {
        MfcSpace {
            inner: t,
            sectors: &self.sectors,
        }
    }

    /// Discover the NDEF sectors through the MAD, validate the GPB of
    /// the first one and scan the mapped area for the NDEF TLV.
    pub fn check(&mut self, t: &mut dyn TagTransport, cfg: &mut TagConfig) -> Result<Detection> {
        *self = Self::default();

        let sectors = Self::discover_sectors(t)?;
        let trailer = t.read_blocks(trailer_block(sectors[0]), 1)?;
        crate::tlv::ensure_len(&trailer, MFC_BLOCK_SIZE)?;
        let gpb = trailer[TRAILER_GPB_OFFSET];
        if (gpb >> 6) & 0b11 != 1 {
            return Err(Error::UnsupportedVersion(gpb));
        }
        if (gpb >> 2) & 0b11 != 0 {
            return Err(Error::UnsupportedTag("read access denied".to_string()));
        }
        let writable = match gpb & 0b11 {
            0b00 => true,
            0b11 => false,
            other => {
                return Err(Error::UnsupportedTag(format!(
                    "rfu write access bits {:#04b}",
                    other
                )))
            }
        };
        let size = sectors.len() * DATA_BLOCKS_PER_SECTOR as usize * MFC_BLOCK_SIZE;
        cfg.memory_size = size as u32;
        debug!(
            "mad names {} ndef sectors, {} logical bytes, gpb {:#04x}",
            sectors.len(),
            size,
            gpb
        );

        self.sectors = sectors;
        let mut space = MfcSpace {
            inner: t,
            sectors: &self.sectors,
        };
        let area = TlvArea::detect(&mut space, 0, size, &[])?;
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
        self.area = Some(area);
        self.gpb = gpb;
        Ok(Detection {
            state,
            version: gpb,
            ndef_len: loc.length,
            max_ndef_len,
        })
    }

    /// Read the detected message through the sector mapping.
    pub fn read(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig) -> Result<Vec<u8>> {
        let area = self.area()?.clone();
        area.read(&mut self.space(t), MFC_BLOCK_SIZE)
    }

    /// Replace the detected message.
    pub fn write(&mut self, t: &mut dyn TagTransport, cfg: &TagConfig, data: &[u8]) -> Result<()> {
        let mut area = self.area()?.clone();
        area.write(&mut self.space(t), data, cfg.terminator_tlv)?;
        self.area = Some(area);
        Ok(())
    }

    /// Zero the message length.
    pub fn erase(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig) -> Result<()> {
        let mut area = self.area()?.clone();
        area.erase(&mut self.space(t))?;
        self.area = Some(area);
        Ok(())
    }

    /// Reset the TLV stream of an already MAD-provisioned card to an
    /// empty message. Writing the MAD itself (and the sector keys) is
    /// issuing work outside this layer.
    pub fn format(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig) -> Result<()> {
        let sectors = Self::discover_sectors(t)?;
        self.sectors = sectors;
        let mut space = MfcSpace {
            inner: t,
            sectors: &self.sectors,
        };
        transport::write_span(&mut space, 0, &crate::tag::area::format_tlvs())?;
        debug!("mfc formatted across {} sectors", self.sectors.len());
        Ok(())
    }

    /// Set the write-denied bits in the GPB of every NDEF sector trailer.
    pub fn set_read_only(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig) -> Result<()> {
        self.area()?;
        for i in 0..self.sectors.len() {
            let sector = self.sectors[i];
            let mut trailer = t.read_blocks(trailer_block(sector), 1)?;
            crate::tlv::ensure_len(&trailer, MFC_BLOCK_SIZE)?;
            trailer[TRAILER_GPB_OFFSET] |= 0b11;
            t.write_blocks(trailer_block(sector), &trailer[..MFC_BLOCK_SIZE])?;
        }
        self.gpb |= 0b11;
        Ok(())
    }
}
