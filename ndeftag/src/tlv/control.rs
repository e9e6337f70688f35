// ndeftag/src/tlv/control.rs
//! Lock-Control / Memory-Control TLV decoding and the reserved-byte skip
//! map built from them. Payload read/write on Type 1/2 tags must never
//! touch lock, reserved or OTP bytes; the map answers which addresses to
//! step over.

use crate::transport::TagTransport;
use crate::types::{LockControlTlv, MemoryControlTlv};
use crate::{Error, Result};

/// Decode a Lock Control TLV value (3 bytes).
///
/// Byte 0 packs page address (high nibble) and byte offset (low nibble),
/// byte 1 is the lock-bit count (0 decodes as 256), byte 2 packs the
/// bytes-locked-per-bit exponent (high nibble) and the bytes-per-page
/// exponent (low nibble). Addresses expand with a shift, not a division:
/// the fields are power-of-two exponents.
pub fn decode_lock_control(tlv_offset: usize, value: &[u8]) -> Result<LockControlTlv> {
    crate::tlv::ensure_len(value, 3)?;
    let page_addr = usize::from(value[0] >> 4);
    let byte_offset = usize::from(value[0] & 0x0F);
    let size_bits = match value[1] {
        0 => 256,
        n => usize::from(n),
    };
    let bytes_locked_per_bit = 1usize << (value[2] >> 4);
    let bytes_per_page = 1usize << (value[2] & 0x0F);
    Ok(LockControlTlv {
        tlv_offset,
        lock_addr: (page_addr << (value[2] & 0x0F) as usize) + byte_offset,
        size_bits,
        bytes_per_page,
        bytes_locked_per_bit,
    })
}

/// Decode a Memory Control TLV value (3 bytes): position byte, reserved
/// size in bytes (0 decodes as 256), bytes-per-page exponent.
pub fn decode_memory_control(tlv_offset: usize, value: &[u8]) -> Result<MemoryControlTlv> {
    crate::tlv::ensure_len(value, 3)?;
    let page_addr = usize::from(value[0] >> 4);
    let byte_offset = usize::from(value[0] & 0x0F);
    let size_bytes = match value[1] {
        0 => 256,
        n => usize::from(n),
    };
    let bytes_per_page = 1usize << (value[2] & 0x0F);
    Ok(MemoryControlTlv {
        tlv_offset,
        rsvd_addr: (page_addr << (value[2] & 0x0F) as usize) + byte_offset,
        size_bytes,
        bytes_per_page,
    })
}

impl LockControlTlv {
    /// Byte span occupied by the lock bits themselves.
    pub fn lock_span(&self) -> (usize, usize) {
        (self.lock_addr, self.size_bits.div_ceil(8))
    }
}

/// Set of absolute byte ranges that payload read/write must step over.
#[derive(Debug, Default, Clone)]
pub struct SkipMap {
    ranges: Vec<(usize, usize)>, // (start, end) half-open
}

impl SkipMap {
    /// Empty map: every address is data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the map from the control TLVs a scan produced.
    pub fn from_controls(locks: &[LockControlTlv], mems: &[MemoryControlTlv]) -> Self {
        let mut map = Self::new();
        for lock in locks {
            let (addr, len) = lock.lock_span();
            map.add(addr, len);
        }
        for mem in mems {
            map.add(mem.rsvd_addr, mem.size_bytes);
        }
        map
    }

    /// Mark `len` bytes at `start` as reserved.
    pub fn add(&mut self, start: usize, len: usize) {
        if len > 0 {
            self.ranges.push((start, start + len));
        }
    }

    /// Whether `addr` falls in a reserved range.
    pub fn contains(&self, addr: usize) -> bool {
        self.ranges.iter().any(|&(s, e)| addr >= s && addr < e)
    }

    /// Number of usable data bytes in `[start, end)`.
    pub fn data_len(&self, start: usize, end: usize) -> usize {
        (start..end).filter(|&a| !self.contains(a)).count()
    }

    /// The `n`-th usable data address at or after `start`, if any below
    /// `end`.
    pub fn nth_data_addr(&self, start: usize, end: usize, n: usize) -> Option<usize> {
        (start..end).filter(|&a| !self.contains(a)).nth(n)
    }
}

/// Read `len` payload bytes starting at `start`, skipping reserved
/// addresses. Each transport fetch covers up to `max_chunk` bytes of
/// whole blocks, floored at one block, so a transport capable of
/// multi-block reads is driven with fewer exchanges.
pub fn read_data(
    t: &mut dyn TagTransport,
    start: usize,
    end: usize,
    skip: &SkipMap,
    len: usize,
    max_chunk: usize,
) -> Result<Vec<u8>> {
    let bs = t.block_size();
    let blocks_per_fetch = (max_chunk / bs).max(1);
    let last_block = end.saturating_sub(1) / bs;
    let mut out = Vec::with_capacity(len);
    let mut addr = start;
    let mut cache: Option<(usize, Vec<u8>)> = None; // (first block, bytes)
    while out.len() < len {
        if addr >= end {
            return Err(Error::MisconfiguredTag(format!(
                "ndef length {} exceeds the data area",
                len
            )));
        }
        if !skip.contains(addr) {
            let block = addr / bs;
            let hit = matches!(&cache,
                Some((first, buf)) if block >= *first && (block - first + 1) * bs <= buf.len());
            if !hit {
                let count = blocks_per_fetch.min(last_block - block + 1);
                let fresh = t.read_blocks(block as u32, count)?;
                crate::tlv::ensure_len(&fresh, count * bs)?;
                cache = Some((block, fresh));
            }
            if let Some((first, buf)) = &cache {
                out.push(buf[addr - first * bs]);
            }
        }
        addr += 1;
    }
    Ok(out)
}

/// Write payload bytes starting at `start`, skipping reserved addresses.
/// Partial blocks are read, patched and written back.
pub fn write_data(
    t: &mut dyn TagTransport,
    start: usize,
    end: usize,
    skip: &SkipMap,
    data: &[u8],
) -> Result<()> {
    let bs = t.block_size();
    let mut addr = start;
    let mut remaining = data;
    while !remaining.is_empty() {
        if addr >= end {
            return Err(Error::BufferOverflow {
                needed: data.len(),
                capacity: skip.data_len(start, end),
            });
        }
        let block = addr / bs;
        let block_start = block * bs;
        let block_end = block_start + bs;
        let mut buf = t.read_blocks(block as u32, 1)?;
        crate::tlv::ensure_len(&buf, bs)?;
        let mut dirty = false;
        while addr < block_end && !remaining.is_empty() {
            if addr >= end {
                break;
            }
            if !skip.contains(addr) {
                buf[addr - block_start] = remaining[0];
                remaining = &remaining[1..];
                dirty = true;
            }
            addr += 1;
        }
        if dirty {
            t.write_blocks(block as u32, &buf[..bs])?;
        }
    }
    Ok(())
}
