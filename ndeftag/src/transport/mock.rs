// ndeftag/src/transport/mock.rs
//! In-memory tag doubles for unit and integration tests: a block-image
//! tag for the block-addressed types and a file-level emulator for
//! Type 4 Tag APDU exchanges.

use crate::constants::{
    CC_FILE_ID, INS_READ_BINARY, INS_READ_BINARY_ODO, INS_SELECT, INS_UPDATE_BINARY,
    INS_UPDATE_BINARY_DDO, NDEF_APP_NAME,
};
use crate::transport::traits::TagTransport;
use crate::{Error, Result};

/// Block-image tag. Reads and writes operate on `image`; writes are also
/// recorded for assertions. Testing hooks allow failing the Nth read or
/// write to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryTag {
    /// Raw tag memory, directly pokeable by test setup
    pub image: Vec<u8>,
    block_size: usize,
    /// Write log: (start block, data)
    pub writes: Vec<(u32, Vec<u8>)>,
    /// Sector-select log
    pub sector_selects: Vec<u8>,
    /// Blocks locked through the lock-block command
    pub locked: Vec<u32>,
    /// Number of reads performed
    pub reads: usize,
    /// Testing hook: reads remaining before read_blocks fails
    fail_reads_after: Option<usize>,
    /// Testing hook: writes remaining before write_blocks fails
    fail_writes_after: Option<usize>,
}

impl MemoryTag {
    /// Zero-filled tag of `size` bytes.
    pub fn new(size: usize, block_size: usize) -> Self {
        Self {
            image: vec![0u8; size],
            block_size,
            ..Self::default()
        }
    }

    /// Tag over a prepared memory image.
    pub fn with_image(image: Vec<u8>, block_size: usize) -> Self {
        Self {
            image,
            block_size,
            ..Self::default()
        }
    }

    /// Fail every read after the next `n` succeed.
    pub fn fail_reads_after(&mut self, n: usize) {
        self.fail_reads_after = Some(n);
    }

    /// Fail every write after the next `n` succeed.
    pub fn fail_writes_after(&mut self, n: usize) {
        self.fail_writes_after = Some(n);
    }

    fn span(&self, start_block: u32, len: usize) -> Result<(usize, usize)> {
        let start = start_block as usize * self.block_size;
        let end = start + len;
        if end > self.image.len() {
            return Err(Error::Transport(format!(
                "block access [{:#x}, {:#x}) outside {}-byte image",
                start,
                end,
                self.image.len()
            )));
        }
        Ok((start, end))
    }
}

impl TagTransport for MemoryTag {
    fn read_blocks(&mut self, start_block: u32, count: usize) -> Result<Vec<u8>> {
        if let Some(left) = &mut self.fail_reads_after {
            if *left == 0 {
                return Err(Error::Timeout);
            }
            *left -= 1;
        }
        self.reads += 1;
        let (start, end) = self.span(start_block, count * self.block_size)?;
        Ok(self.image[start..end].to_vec())
    }

    fn write_blocks(&mut self, start_block: u32, data: &[u8]) -> Result<()> {
        if let Some(left) = &mut self.fail_writes_after {
            if *left == 0 {
                return Err(Error::Timeout);
            }
            *left -= 1;
        }
        if data.is_empty() || data.len() % self.block_size != 0 {
            return Err(Error::InvalidLength {
                expected: self.block_size,
                actual: data.len(),
            });
        }
        let (start, end) = self.span(start_block, data.len())?;
        self.image[start..end].copy_from_slice(data);
        self.writes.push((start_block, data.to_vec()));
        Ok(())
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn select_sector(&mut self, sector: u8) -> Result<()> {
        self.sector_selects.push(sector);
        Ok(())
    }

    fn lock_block(&mut self, block: u32) -> Result<()> {
        self.locked.push(block);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectedFile {
    None,
    Application,
    CcFile,
    NdefFile,
}

/// File-level Type 4 Tag emulator. Understands the NDEF application
/// select, file select by identifier, READ/UPDATE BINARY in both plain
/// and ODO/DDO-wrapped forms, in short or extended encoding.
#[derive(Debug)]
pub struct Type4Emulator {
    /// Capability container file content
    pub cc_file: Vec<u8>,
    /// NDEF file content, NLEN/ENLEN included
    pub ndef_file: Vec<u8>,
    /// File identifier the NDEF file answers to
    pub ndef_file_id: u16,
    /// UPDATE BINARY answered with SW 6982 when set
    pub read_only: bool,
    /// Which length encoding the emulator expects on the wire
    pub extended: bool,
    /// Every C-APDU received, in order
    pub apdu_log: Vec<Vec<u8>>,
    selected: SelectedFile,
}

impl Type4Emulator {
    /// Emulator over the given CC and NDEF file contents.
    pub fn new(cc_file: Vec<u8>, ndef_file: Vec<u8>, ndef_file_id: u16) -> Self {
        Self {
            cc_file,
            ndef_file,
            ndef_file_id,
            read_only: false,
            extended: false,
            apdu_log: Vec::new(),
            selected: SelectedFile::None,
        }
    }

    fn reply(data: &[u8], sw: u16) -> Vec<u8> {
        let mut out = data.to_vec();
        out.extend_from_slice(&sw.to_be_bytes());
        out
    }

    fn sw_only(sw: u16) -> Vec<u8> {
        sw.to_be_bytes().to_vec()
    }

    /// Split the body after the 4-byte header into (command data, Le).
    fn split_body(&self, ins: u8, body: &[u8]) -> Result<(Vec<u8>, Option<usize>)> {
        let has_data = matches!(
            ins,
            INS_SELECT | INS_UPDATE_BINARY | INS_UPDATE_BINARY_DDO | INS_READ_BINARY_ODO
        );
        let wants_le = matches!(ins, INS_READ_BINARY | INS_READ_BINARY_ODO | INS_SELECT);

        let mut data = Vec::new();
        let mut rest = body;
        if has_data && !rest.is_empty() {
            if self.extended {
                crate::tlv::ensure_len(rest, 3)?;
                let lc = usize::from(rest[1]) << 8 | usize::from(rest[2]);
                crate::tlv::ensure_len(rest, 3 + lc)?;
                data = rest[3..3 + lc].to_vec();
                rest = &rest[3 + lc..];
            } else {
                let lc = usize::from(rest[0]);
                crate::tlv::ensure_len(rest, 1 + lc)?;
                data = rest[1..1 + lc].to_vec();
                rest = &rest[1 + lc..];
            }
        }

        let le = if wants_le && !rest.is_empty() {
            if self.extended {
                if has_data && !data.is_empty() {
                    crate::tlv::ensure_len(rest, 2)?;
                    let raw = usize::from(rest[0]) << 8 | usize::from(rest[1]);
                    Some(if raw == 0 { 0x1_0000 } else { raw })
                } else {
                    crate::tlv::ensure_len(rest, 3)?;
                    let raw = usize::from(rest[1]) << 8 | usize::from(rest[2]);
                    Some(if raw == 0 { 0x1_0000 } else { raw })
                }
            } else {
                Some(if rest[0] == 0 { 256 } else { usize::from(rest[0]) })
            }
        } else {
            None
        };

        Ok((data, le))
    }

    fn selected_file(&mut self) -> Option<&mut Vec<u8>> {
        match self.selected {
            SelectedFile::CcFile => Some(&mut self.cc_file),
            SelectedFile::NdefFile => Some(&mut self.ndef_file),
            _ => None,
        }
    }

    fn handle(&mut self, capdu: &[u8]) -> Result<Vec<u8>> {
        crate::tlv::ensure_len(capdu, 4)?;
        let ins = capdu[1];
        let p1 = capdu[2];
        let p2 = capdu[3];
        let (data, le) = self.split_body(ins, &capdu[4..])?;

        Ok(match ins {
            INS_SELECT => match p1 {
                0x04 => {
                    if data == NDEF_APP_NAME {
                        self.selected = SelectedFile::Application;
                        Self::sw_only(0x9000)
                    } else {
                        Self::sw_only(0x6A82)
                    }
                }
                0x00 => {
                    if self.selected == SelectedFile::None {
                        return Ok(Self::sw_only(0x6985));
                    }
                    if data.len() != 2 {
                        return Ok(Self::sw_only(0x6700));
                    }
                    let fid = u16::from(data[0]) << 8 | u16::from(data[1]);
                    if fid == CC_FILE_ID {
                        self.selected = SelectedFile::CcFile;
                        Self::sw_only(0x9000)
                    } else if fid == self.ndef_file_id {
                        self.selected = SelectedFile::NdefFile;
                        Self::sw_only(0x9000)
                    } else {
                        Self::sw_only(0x6A82)
                    }
                }
                _ => Self::sw_only(0x6A86),
            },
            INS_READ_BINARY => {
                let offset = usize::from(p1) << 8 | usize::from(p2);
                let le = le.unwrap_or(0);
                match self.selected_file() {
                    Some(file) if offset <= file.len() => {
                        let end = (offset + le).min(file.len());
                        let chunk = file[offset..end].to_vec();
                        Self::reply(&chunk, 0x9000)
                    }
                    Some(_) => Self::sw_only(0x6A86),
                    None => Self::sw_only(0x6985),
                }
            }
            INS_READ_BINARY_ODO => {
                let offset = crate::apdu::ber::parse_odo(&data)? as usize;
                let le = le.unwrap_or(0);
                match self.selected_file() {
                    Some(file) if offset <= file.len() => {
                        // Response DDO overhead eats into Le
                        let end = (offset + le.saturating_sub(4)).min(file.len());
                        let wrapped = crate::apdu::ber::encode_ddo(&file[offset..end])?;
                        Self::reply(&wrapped, 0x9000)
                    }
                    Some(_) => Self::sw_only(0x6A86),
                    None => Self::sw_only(0x6985),
                }
            }
            INS_UPDATE_BINARY => {
                if self.read_only {
                    return Ok(Self::sw_only(0x6982));
                }
                let offset = usize::from(p1) << 8 | usize::from(p2);
                match self.selected_file() {
                    Some(file) if offset + data.len() <= file.len() => {
                        file[offset..offset + data.len()].copy_from_slice(&data);
                        Self::sw_only(0x9000)
                    }
                    Some(_) => Self::sw_only(0x6A86),
                    None => Self::sw_only(0x6985),
                }
            }
            INS_UPDATE_BINARY_DDO => {
                if self.read_only {
                    return Ok(Self::sw_only(0x6982));
                }
                let offset = crate::apdu::ber::parse_odo(&data)? as usize;
                let content = crate::apdu::ber::parse_ddo(&data[5..])?.to_vec();
                match self.selected_file() {
                    Some(file) if offset + content.len() <= file.len() => {
                        file[offset..offset + content.len()].copy_from_slice(&content);
                        Self::sw_only(0x9000)
                    }
                    Some(_) => Self::sw_only(0x6A86),
                    None => Self::sw_only(0x6985),
                }
            }
            _ => Self::sw_only(0x6D00),
        })
    }
}

impl TagTransport for Type4Emulator {
    fn read_blocks(&mut self, _start_block: u32, _count: usize) -> Result<Vec<u8>> {
        Err(Error::UnsupportedOperation(
            "type 4 tags are file addressed".to_string(),
        ))
    }

    fn write_blocks(&mut self, _start_block: u32, _data: &[u8]) -> Result<()> {
        Err(Error::UnsupportedOperation(
            "type 4 tags are file addressed".to_string(),
        ))
    }

    fn block_size(&self) -> usize {
        0
    }

    fn exchange_apdu(&mut self, capdu: &[u8], _expected_len: usize) -> Result<Vec<u8>> {
        self.apdu_log.push(capdu.to_vec());
        self.handle(capdu)
    }
}
