// ndeftag/src/transport/traits.rs

use crate::{Error, Result};

/// Transport trait abstracting the per-type protocol layer (ISO14443,
/// FeliCa, ISO15693) away from the tag-operation codecs.
///
/// Every exchange is a single blocking request/reply; this layer never
/// retries. Optional operations carry defaults so simple block transports
/// keep working without implementing them.
pub trait TagTransport {
    /// Read `count` blocks starting at `start_block`. The returned buffer
    /// is `count * block_size()` bytes.
    fn read_blocks(&mut self, start_block: u32, count: usize) -> Result<Vec<u8>>;

    /// Write whole blocks starting at `start_block`. `data` must be a
    /// multiple of `block_size()`.
    fn write_blocks(&mut self, start_block: u32, data: &[u8]) -> Result<()>;

    /// Block size of the activated tag in bytes.
    fn block_size(&self) -> usize;

    /// Exchange an ISO7816-4 APDU (Type 4 Tag only). The response includes
    /// the trailing SW1SW2 bytes.
    fn exchange_apdu(&mut self, _capdu: &[u8], _expected_len: usize) -> Result<Vec<u8>> {
        Err(Error::UnsupportedOperation("apdu exchange".to_string()))
    }

    /// Select a memory sector before subsequent block accesses (Type 2
    /// Tag beyond 1 KB). Single-sector transports may ignore this.
    fn select_sector(&mut self, _sector: u8) -> Result<()> {
        Ok(())
    }

    /// Permanently lock a single block (Type 5 Tag).
    fn lock_block(&mut self, _block: u32) -> Result<()> {
        Err(Error::UnsupportedOperation("lock block".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MemoryTag;

    #[test]
    fn defaults_for_optional_operations() {
        let mut tag = MemoryTag::new(64, 4);
        assert!(matches!(
            tag.exchange_apdu(&[0x00, 0xA4, 0x00, 0x0C], 2),
            Err(Error::UnsupportedOperation(_))
        ));
        // MemoryTag implements sector select and lock explicitly
        tag.select_sector(1).unwrap();
        tag.lock_block(3).unwrap();
    }

    #[test]
    fn trait_object_block_io() {
        let mut tag = MemoryTag::new(16, 4);
        let t: &mut dyn TagTransport = &mut tag;
        t.write_blocks(1, &[1, 2, 3, 4]).unwrap();
        assert_eq!(t.read_blocks(1, 1).unwrap(), vec![1, 2, 3, 4]);
    }
}
