// ndeftag/src/transport/mod.rs
//! Transport boundary: the abstract tag transport trait, the in-memory
//! test doubles, and byte-span helpers layered on block I/O.

pub mod mock;
pub mod traits;

pub use traits::TagTransport;

use crate::Result;

/// Read an arbitrary byte span, fetching whole blocks as required.
pub fn read_span(t: &mut dyn TagTransport, addr: usize, len: usize) -> Result<Vec<u8>> {
    if len == 0 {
        return Ok(Vec::new());
    }
    let bs = t.block_size();
    let first_block = addr / bs;
    let last_block = (addr + len - 1) / bs;
    let count = last_block - first_block + 1;
    let raw = t.read_blocks(first_block as u32, count)?;
    let start = addr - first_block * bs;
    crate::tlv::ensure_len(&raw, start + len)?;
    Ok(raw[start..start + len].to_vec())
}

/// Write an arbitrary byte span. Partial edge blocks are read, patched
/// and written back; interior blocks are written directly.
pub fn write_span(t: &mut dyn TagTransport, addr: usize, data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    let bs = t.block_size();
    let mut addr = addr;
    let mut data = data;
    while !data.is_empty() {
        let block = addr / bs;
        let offset = addr % bs;
        let take = (bs - offset).min(data.len());
        if offset == 0 && take == bs {
            t.write_blocks(block as u32, &data[..bs])?;
        } else {
            let mut current = t.read_blocks(block as u32, 1)?;
            crate::tlv::ensure_len(&current, bs)?;
            current[offset..offset + take].copy_from_slice(&data[..take]);
            t.write_blocks(block as u32, &current[..bs])?;
        }
        addr += take;
        data = &data[take..];
    }
    Ok(())
}
