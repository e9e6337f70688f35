// ndeftag/src/tlv/scanner.rs

use log::{debug, trace};

use crate::constants::{
    MAX_NULL_TLV_RUN, TLV_LEN_ESCAPE, TLV_LOCK_CONTROL, TLV_MEMORY_CONTROL, TLV_NDEF, TLV_NULL,
    TLV_PROPRIETARY, TLV_TERMINATOR,
};
use crate::transport::TagTransport;
use crate::types::{LockControlTlv, MemoryControlTlv, NdefLocation};
use crate::{Error, Result};

/// Everything a scan of the data area produced. The scan stops at the
/// NDEF TLV (or a Terminator, or the end of the area), so `ndef` being
/// `None` means the tag carries no NDEF message.
#[derive(Debug, Default, Clone)]
pub struct ScanReport {
    /// NDEF TLV location, when one was found
    pub ndef: Option<NdefLocation>,
    /// Lock Control TLVs seen before the NDEF TLV
    pub locks: Vec<LockControlTlv>,
    /// Memory Control TLVs seen before the NDEF TLV
    pub mems: Vec<MemoryControlTlv>,
}

/// Chunked reader over the tag's data area. Fetches one block at a time
/// and splices the next chunk onto the current one whenever a TLV header
/// would otherwise be cut by the block boundary.
struct ChunkReader<'a> {
    transport: &'a mut dyn TagTransport,
    block_size: usize,
    /// Absolute address of `buf[0]`
    buf_base: usize,
    buf: Vec<u8>,
    /// Absolute read position
    pos: usize,
    /// Absolute end of the scannable area
    end: usize,
}

impl<'a> ChunkReader<'a> {
    fn new(transport: &'a mut dyn TagTransport, start: usize, end: usize) -> Self {
        let block_size = transport.block_size();
        let buf_base = (start / block_size) * block_size;
        Self {
            transport,
            block_size,
            buf_base,
            buf: Vec::new(),
            pos: start,
            end,
        }
    }

    fn addr(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> usize {
        self.end.saturating_sub(self.pos)
    }

    /// Make `n` bytes available at the current position, splicing further
    /// blocks onto the buffer as needed.
    fn ensure(&mut self, n: usize) -> Result<()> {
        if self.pos + n > self.end {
            return Err(Error::MisconfiguredTag(format!(
                "tlv at {:#x} crosses the end of the data area",
                self.pos
            )));
        }
        while self.buf_base + self.buf.len() < self.pos + n {
            let next_block = (self.buf_base + self.buf.len()) / self.block_size;
            let chunk = self.transport.read_blocks(next_block as u32, 1)?;
            crate::tlv::ensure_len(&chunk, self.block_size)?;
            self.buf.extend_from_slice(&chunk[..self.block_size]);
        }
        Ok(())
    }

    fn peek(&mut self, n: usize) -> Result<&[u8]> {
        self.ensure(n)?;
        let start = self.pos - self.buf_base;
        Ok(&self.buf[start..start + n])
    }

    fn take_byte(&mut self) -> Result<u8> {
        let b = self.peek(1)?[0];
        self.advance(1);
        Ok(b)
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
        // Drop fully consumed blocks so the working set stays one or two
        // chunks regardless of area size.
        let consumed_blocks = (self.pos - self.buf_base) / self.block_size;
        if consumed_blocks > 1 {
            let drop = (consumed_blocks - 1) * self.block_size;
            self.buf.drain(..drop.min(self.buf.len()));
            self.buf_base += drop;
        }
    }

    /// Read a TLV length field: one byte, or three with the 0xFF escape.
    /// The field may straddle a block boundary; `ensure` splices for us.
    fn take_len(&mut self) -> Result<(usize, u8)> {
        let first = self.take_byte()?;
        if first == TLV_LEN_ESCAPE {
            let hi = self.take_byte()?;
            let lo = self.take_byte()?;
            Ok((usize::from(hi) << 8 | usize::from(lo), 3))
        } else {
            Ok((usize::from(first), 1))
        }
    }
}

/// Walk the TLV stream in `[start, end)` of the tag's data area.
///
/// Stops when the NDEF TLV or a Terminator TLV is found, or when the area
/// is exhausted. More than [`MAX_NULL_TLV_RUN`] consecutive NULL TLVs is
/// treated as a structural defect.
pub fn scan(transport: &mut dyn TagTransport, start: usize, end: usize) -> Result<ScanReport> {
    let mut reader = ChunkReader::new(transport, start, end);
    let mut report = ScanReport::default();
    let mut null_run = 0usize;

    while reader.remaining() > 0 {
        let tlv_addr = reader.addr();
        let tag = reader.take_byte()?;
        if tag != TLV_NULL {
            null_run = 0;
        }
        match tag {
            TLV_NULL => {
                null_run += 1;
                if null_run > MAX_NULL_TLV_RUN {
                    return Err(Error::MisconfiguredTag(format!(
                        "{} consecutive null tlvs at {:#x}",
                        null_run, tlv_addr
                    )));
                }
            }
            TLV_LOCK_CONTROL => {
                let (len, _) = reader.take_len()?;
                if len != 3 {
                    return Err(Error::MisconfiguredTag(format!(
                        "lock control tlv length {} at {:#x}",
                        len, tlv_addr
                    )));
                }
                let value = reader.peek(3)?.to_vec();
                reader.advance(3);
                let lock = crate::tlv::control::decode_lock_control(tlv_addr - start, &value)?;
                trace!("lock control tlv: {:?}", lock);
                report.locks.push(lock);
            }
            TLV_MEMORY_CONTROL => {
                let (len, _) = reader.take_len()?;
                if len != 3 {
                    return Err(Error::MisconfiguredTag(format!(
                        "memory control tlv length {} at {:#x}",
                        len, tlv_addr
                    )));
                }
                let value = reader.peek(3)?.to_vec();
                reader.advance(3);
                let mem = crate::tlv::control::decode_memory_control(tlv_addr - start, &value)?;
                trace!("memory control tlv: {:?}", mem);
                report.mems.push(mem);
            }
            TLV_NDEF => {
                let (length, len_width) = reader.take_len()?;
                let location = NdefLocation {
                    header_addr: tlv_addr,
                    message_addr: reader.addr(),
                    length,
                    len_width,
                };
                debug!(
                    "ndef tlv: header at {:#x}, {} bytes, {}-byte length field",
                    location.header_addr, location.length, location.len_width
                );
                report.ndef = Some(location);
                return Ok(report);
            }
            TLV_TERMINATOR => {
                debug!("terminator tlv at {:#x}, no ndef tlv found", tlv_addr);
                return Ok(report);
            }
            TLV_PROPRIETARY => {
                let (len, _) = reader.take_len()?;
                reader.ensure(len)?;
                reader.advance(len);
            }
            // RFU blocks are skipped the same way as proprietary ones
            _ => {
                let (len, _) = reader.take_len()?;
                reader.ensure(len)?;
                reader.advance(len);
            }
        }
    }

    Ok(report)
}
