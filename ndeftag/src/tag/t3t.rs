// ndeftag/src/tag/t3t.rs
//! Type 3 Tag (FeliCa, 16-byte blocks). Block 0 is the attribute block:
//! version, Nbr/Nbw transfer limits, NmaxB capacity, the WriteFlag used
//! for tear detection, the RWFlag, the 3-byte message length and a 16-bit
//! checksum over the first 14 bytes. Message data starts at block 1.
//!
//! Writes bracket the data transfer with the WriteFlag: it is raised
//! before the first data block goes out and only cleared together with
//! the new length, so an interrupted write is visible to the next reader.

use log::debug;

use crate::config::TagConfig;
use crate::constants::{
    T3T_BLOCK_SIZE, T3T_WRITE_FLAG_BUSY, T3T_WRITE_FLAG_DONE,
};
use crate::tag::Detection;
use crate::transport::TagTransport;
use crate::types::TagState;
use crate::{Error, Result};

const ATTR_VERSION: usize = 0;
const ATTR_NBR: usize = 1;
const ATTR_NBW: usize = 2;
const ATTR_NMAXB: usize = 3;
const ATTR_WRITE_FLAG: usize = 9;
const ATTR_RW_FLAG: usize = 10;
const ATTR_LN: usize = 11;
const ATTR_CHECKSUM: usize = 14;

fn checksum(attr: &[u8; 16]) -> u16 {
    attr[..ATTR_CHECKSUM]
        .iter()
        .fold(0u16, |sum, &b| sum.wrapping_add(u16::from(b)))
}

fn seal(attr: &mut [u8; 16]) {
    let sum = checksum(attr);
    attr[ATTR_CHECKSUM..].copy_from_slice(&sum.to_be_bytes());
}

fn set_len(attr: &mut [u8; 16], len: usize) {
    attr[ATTR_LN] = (len >> 16) as u8;
    attr[ATTR_LN + 1] = (len >> 8) as u8;
    attr[ATTR_LN + 2] = len as u8;
}

/// Per-detection Type 3 Tag session.
#[derive(Debug, Default)]
pub struct Type3Session {
    attr: [u8; 16],
    present: bool,
}

impl Type3Session {
    fn attr(&self) -> Result<&[u8; 16]> {
        if self.present {
            Ok(&self.attr)
        } else {
            Err(Error::InvalidState)
        }
    }

    fn nmaxb(&self) -> usize {
        usize::from(self.attr[ATTR_NMAXB]) << 8 | usize::from(self.attr[ATTR_NMAXB + 1])
    }

    fn ln(&self) -> usize {
        usize::from(self.attr[ATTR_LN]) << 16
            | usize::from(self.attr[ATTR_LN + 1]) << 8
            | usize::from(self.attr[ATTR_LN + 2])
    }

    fn write_attr(&mut self, t: &mut dyn TagTransport) -> Result<()> {
        seal(&mut self.attr);
        t.write_blocks(0, &self.attr)
    }

    /// Validate the attribute block, its checksum and the write flag.
    pub fn check(&mut self, t: &mut dyn TagTransport, cfg: &mut TagConfig) -> Result<Detection> {
        *self = Self::default();

        let raw = t.read_blocks(0, 1)?;
        crate::tlv::ensure_len(&raw, T3T_BLOCK_SIZE)?;
        let mut attr = [0u8; 16];
        attr.copy_from_slice(&raw[..16]);

        if attr[ATTR_VERSION] >> 4 != 1 {
            return Err(Error::UnsupportedVersion(attr[ATTR_VERSION]));
        }
        let declared = u16::from(attr[ATTR_CHECKSUM]) << 8 | u16::from(attr[ATTR_CHECKSUM + 1]);
        if declared != checksum(&attr) {
            return Err(Error::MisconfiguredTag(format!(
                "attribute checksum {:#06x} does not match {:#06x}",
                declared,
                checksum(&attr)
            )));
        }
        if attr[ATTR_NBR] == 0 || attr[ATTR_NBW] == 0 {
            return Err(Error::MisconfiguredTag(
                "nbr and nbw must be non-zero".to_string(),
            ));
        }
        if attr[ATTR_WRITE_FLAG] != T3T_WRITE_FLAG_DONE {
            return Err(Error::MisconfiguredTag(
                "write flag raised: a previous write was interrupted".to_string(),
            ));
        }
        let writable = match attr[ATTR_RW_FLAG] {
            0x00 => false,
            0x01 => true,
            other => {
                return Err(Error::UnsupportedTag(format!(
                    "rfu rw flag {:#04x}",
                    other
                )))
            }
        };

        self.attr = attr;
        self.present = true;
        let capacity = self.nmaxb() * T3T_BLOCK_SIZE;
        if capacity == 0 {
            self.present = false;
            return Err(Error::MisconfiguredTag("nmaxb is zero".to_string()));
        }
        let ln = self.ln();
        if ln > capacity {
            self.present = false;
            return Err(Error::MisconfiguredTag(format!(
                "ln {} exceeds the {} byte area",
                ln, capacity
            )));
        }
        cfg.memory_size = capacity as u32;
        debug!(
            "t3t attribute block: nbr {}, nbw {}, nmaxb {}, ln {}",
            attr[ATTR_NBR],
            attr[ATTR_NBW],
            self.nmaxb(),
            ln
        );

        let state = if !writable {
            TagState::ReadOnly
        } else if ln == 0 {
            TagState::Initialized
        } else {
            TagState::ReadWrite
        };
        Ok(Detection {
            state,
            version: attr[ATTR_VERSION],
            ndef_len: ln,
            max_ndef_len: capacity,
        })
    }

    /// Read Ln bytes from block 1 on, at most Nbr blocks per fetch.
    pub fn read(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig) -> Result<Vec<u8>> {
        let attr = *self.attr()?;
        let ln = self.ln();
        let nbr = usize::from(attr[ATTR_NBR]);
        let mut blocks_left = ln.div_ceil(T3T_BLOCK_SIZE);
        let mut block = 1u32;
        let mut out = Vec::with_capacity(ln);
        while blocks_left > 0 {
            let count = blocks_left.min(nbr);
            out.extend_from_slice(&t.read_blocks(block, count)?);
            block += count as u32;
            blocks_left -= count;
        }
        out.truncate(ln);
        Ok(out)
    }

    /// Replace the message, bracketing the transfer with the write flag.
    pub fn write(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig, data: &[u8]) -> Result<()> {
        self.attr()?;
        let capacity = self.nmaxb() * T3T_BLOCK_SIZE;
        if data.len() > capacity {
            return Err(Error::BufferOverflow {
                needed: data.len(),
                capacity,
            });
        }
        let nbw = usize::from(self.attr[ATTR_NBW]);

        self.attr[ATTR_WRITE_FLAG] = T3T_WRITE_FLAG_BUSY;
        self.write_attr(t)?;

        let mut padded = data.to_vec();
        padded.resize(data.len().div_ceil(T3T_BLOCK_SIZE) * T3T_BLOCK_SIZE, 0);
        let mut block = 1u32;
        for chunk in padded.chunks(nbw * T3T_BLOCK_SIZE) {
            t.write_blocks(block, chunk)?;
            block += (chunk.len() / T3T_BLOCK_SIZE) as u32;
        }

        self.attr[ATTR_WRITE_FLAG] = T3T_WRITE_FLAG_DONE;
        set_len(&mut self.attr, data.len());
        self.write_attr(t)?;
        debug!("t3t wrote {} bytes in {} blocks", data.len(), padded.len() / 16);
        Ok(())
    }

    /// Zero Ln in the attribute block.
    pub fn erase(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig) -> Result<()> {
        self.attr()?;
        set_len(&mut self.attr, 0);
        self.write_attr(t)
    }

    /// Write a fresh attribute block and an empty message, sized from
    /// the configured memory size.
    pub fn format(&mut self, t: &mut dyn TagTransport, cfg: &TagConfig) -> Result<()> {
        let nmaxb = cfg.memory_size as usize / T3T_BLOCK_SIZE;
        if nmaxb == 0 || nmaxb > 0xFFFF {
            return Err(Error::InvalidParameter(format!(
                "memory size {} does not map to a valid nmaxb",
                cfg.memory_size
            )));
        }
        let mut attr = [0u8; 16];
        attr[ATTR_VERSION] = 0x10;
        attr[ATTR_NBR] = 4;
        attr[ATTR_NBW] = 1;
        attr[ATTR_NMAXB] = (nmaxb >> 8) as u8;
        attr[ATTR_NMAXB + 1] = nmaxb as u8;
        attr[ATTR_WRITE_FLAG] = T3T_WRITE_FLAG_DONE;
        attr[ATTR_RW_FLAG] = 0x01;
        set_len(&mut attr, crate::constants::EMPTY_NDEF_MESSAGE.len());
        seal(&mut attr);

        let mut first = [0u8; 16];
        first[..3].copy_from_slice(&crate::constants::EMPTY_NDEF_MESSAGE);
        t.write_blocks(1, &first)?;
        t.write_blocks(0, &attr)?;
        debug!("t3t formatted with nmaxb {}", nmaxb);
        Ok(())
    }

    /// Clear the RWFlag in the attribute block.
    pub fn set_read_only(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig) -> Result<()> {
        self.attr()?;
        self.attr[ATTR_RW_FLAG] = 0x00;
        self.write_attr(t)
    }
}
