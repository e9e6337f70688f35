// ndeftag/src/tag/t4t.rs
//! Type 4 Tag (ISO14443 + ISO7816-4). The tag is file addressed: the
//! session selects the NDEF Tag Application, reads the capability
//! container file to learn the transfer limits and the NDEF file
//! descriptor, then selects the NDEF file for the data operations. File
//! offsets above 0x7FFF cannot travel in P1/P2 and switch the exchange
//! to the ODO/DDO wrapped command forms.

use log::{debug, trace};

use crate::apdu::{ber, ApduCommand, ApduResponse};
use crate::config::TagConfig;
use crate::constants::{
    CC_FILE_ID, MAX_NDEF_LEN, NDEF_APP_NAME, T4T_MAX_PLAIN_OFFSET, T4T_MIN_FILE_SIZE_MV2,
    T4T_MIN_FILE_SIZE_MV3, T4T_MIN_MLC, T4T_MIN_MLE,
};
use crate::tag::Detection;
use crate::transport::TagTransport;
use crate::types::TagState;
use crate::{Error, Result};

/// NDEF File Control TLV tag (mapping version 2, 2-byte sizes)
const TLV_NDEF_FILE_CONTROL: u8 = 0x04;
/// Extended NDEF File Control TLV tag (mapping version 3, 4-byte size)
const TLV_ENDEF_FILE_CONTROL: u8 = 0x06;

/// Bytes an ODO plus a minimal DDO header add to an UPDATE BINARY body.
const DDO_WRITE_OVERHEAD: usize = 9;
/// Worst-case DDO framing in a READ BINARY response.
const DDO_READ_OVERHEAD: usize = 4;

fn access_byte(byte: u8, what: &str) -> Result<bool> {
    match byte {
        0x00 => Ok(true),
        0xFF => Ok(false),
        other => Err(Error::UnsupportedTag(format!(
            "rfu {} access byte {:#04x}",
            what, other
        ))),
    }
}

fn transceive(t: &mut dyn TagTransport, cmd: &ApduCommand, extended: bool) -> Result<Vec<u8>> {
    let wire = cmd.encode(extended)?;
    trace!("c-apdu: {}", crate::utils::bytes_to_hex(&wire));
    let raw = t.exchange_apdu(&wire, cmd.le.unwrap_or(0) + 2)?;
    ApduResponse::parse(&raw)?.into_checked_data()
}

/// Per-detection Type 4 Tag session.
#[derive(Debug, Default)]
pub struct Type4Session {
    established: bool,
    extended: bool,
    mapping_version: u8,
    mle: usize,
    mlc: usize,
    file_id: u16,
    max_file_size: usize,
    len_width: usize,
    writable: bool,
    /// Offset of the write-access byte inside the CC file, kept so the
    /// read-only transition can patch it in place.
    write_access_offset: usize,
    ndef_len: usize,
}

impl Type4Session {
    fn require_established(&self) -> Result<()> {
        if self.established {
            Ok(())
        } else {
            Err(Error::InvalidState)
        }
    }

    /// Select the application, parse the CC file and select the NDEF
    /// file. Shared by detection and format.
    fn establish(&mut self, t: &mut dyn TagTransport, cfg: &TagConfig) -> Result<()> {
        *self = Self::default();
        self.extended = cfg.extended_apdu;

        transceive(t, &ApduCommand::select_by_name(&NDEF_APP_NAME), self.extended)?;
        transceive(t, &ApduCommand::select_by_id(CC_FILE_ID), self.extended)?;

        let mut cc = transceive(t, &ApduCommand::read_binary(0, 15), self.extended)?;
        crate::tlv::ensure_len(&cc, 15)?;
        let cclen = usize::from(cc[0]) << 8 | usize::from(cc[1]);
        if cclen < 15 {
            return Err(Error::MisconfiguredTag(format!(
                "cc file length {} below the fixed header",
                cclen
            )));
        }
        if cclen > 15 {
            let rest = transceive(
                t,
                &ApduCommand::read_binary(15, (cclen - 15).min(0xFF)),
                self.extended,
            )?;
            cc.extend_from_slice(&rest);
        }

        let mapping_version = cc[2];
        if !matches!(mapping_version >> 4, 2 | 3) {
            return Err(Error::UnsupportedVersion(mapping_version));
        }
        let mle = usize::from(cc[3]) << 8 | usize::from(cc[4]);
        let mlc = usize::from(cc[5]) << 8 | usize::from(cc[6]);
        if mle < usize::from(T4T_MIN_MLE) || mlc < usize::from(T4T_MIN_MLC) {
            return Err(Error::MisconfiguredTag(format!(
                "mle {:#06x} / mlc {:#06x} below the minimum",
                mle, mlc
            )));
        }

        // Walk the CC TLVs for the (extended) NDEF file control block
        let mut off = 7;
        let mut found = false;
        while off + 2 <= cc.len() && off < cclen {
            let tag = cc[off];
            let len = usize::from(cc[off + 1]);
            crate::tlv::ensure_len(&cc, off + 2 + len)?;
            let body = &cc[off + 2..off + 2 + len];
            match (tag, len) {
                (TLV_NDEF_FILE_CONTROL, 6) => {
                    self.file_id = u16::from(body[0]) << 8 | u16::from(body[1]);
                    self.max_file_size = usize::from(body[2]) << 8 | usize::from(body[3]);
                    if self.max_file_size < T4T_MIN_FILE_SIZE_MV2 as usize {
                        return Err(Error::MisconfiguredTag(format!(
                            "ndef file size {:#06x} below the mapping version 2 minimum",
                            self.max_file_size
                        )));
                    }
                    if !access_byte(body[4], "read")? {
                        return Err(Error::UnsupportedTag("read access denied".to_string()));
                    }
                    self.writable = access_byte(body[5], "write")?;
                    self.write_access_offset = off + 2 + 5;
                    self.len_width = 2;
                    found = true;
                    break;
                }
                (TLV_ENDEF_FILE_CONTROL, 8) => {
                    self.file_id = u16::from(body[0]) << 8 | u16::from(body[1]);
                    self.max_file_size = usize::from(body[2]) << 24
                        | usize::from(body[3]) << 16
                        | usize::from(body[4]) << 8
                        | usize::from(body[5]);
                    if self.max_file_size < T4T_MIN_FILE_SIZE_MV3 as usize {
                        return Err(Error::MisconfiguredTag(format!(
                            "ndef file size {:#010x} below the mapping version 3 minimum",
                            self.max_file_size
                        )));
                    }
                    if !access_byte(body[6], "read")? {
                        return Err(Error::UnsupportedTag("read access denied".to_string()));
                    }
                    self.writable = access_byte(body[7], "write")?;
                    self.write_access_offset = off + 2 + 7;
                    self.len_width = 4;
                    found = true;
                    break;
                }
                _ => {
                    off += 2 + len;
                }
            }
        }
        if !found {
            return Err(Error::MisconfiguredTag(
                "cc file carries no ndef file control tlv".to_string(),
            ));
        }

        self.mapping_version = mapping_version;
        self.mle = mle;
        self.mlc = mlc;
        debug!(
            "t4t cc: mapping {:#04x}, mle {:#06x}, mlc {:#06x}, file {:#06x} of {} bytes",
            mapping_version, mle, mlc, self.file_id, self.max_file_size
        );

        transceive(t, &ApduCommand::select_by_id(self.file_id), self.extended)?;
        self.established = true;
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.max_file_size.saturating_sub(self.len_width)
    }

    /// Largest Le usable on a single read with the active encoding.
    fn read_limit(&self) -> usize {
        if self.extended {
            self.mle
        } else {
            self.mle.min(256)
        }
    }

    /// Largest data field usable on a single update with the active
    /// encoding.
    fn write_limit(&self) -> usize {
        if self.extended {
            self.mlc
        } else {
            self.mlc.min(255)
        }
    }

    fn read_chunk(&self, t: &mut dyn TagTransport, offset: usize, remaining: usize) -> Result<Vec<u8>> {
        if offset <= T4T_MAX_PLAIN_OFFSET as usize {
            let le = remaining.min(self.read_limit());
            transceive(
                t,
                &ApduCommand::read_binary(offset as u16, le),
                self.extended,
            )
        } else {
            let le = (remaining + DDO_READ_OVERHEAD).min(self.read_limit());
            let body = transceive(
                t,
                &ApduCommand::read_binary_odo(offset as u32, le),
                self.extended,
            )?;
            Ok(ber::parse_ddo(&body)?.to_vec())
        }
    }

    fn write_chunk(&self, t: &mut dyn TagTransport, offset: usize, data: &[u8]) -> Result<usize> {
        if offset <= T4T_MAX_PLAIN_OFFSET as usize {
            let take = data.len().min(self.write_limit());
            transceive(
                t,
                &ApduCommand::update_binary(offset as u16, &data[..take]),
                self.extended,
            )?;
            Ok(take)
        } else {
            let take = data
                .len()
                .min(self.write_limit().saturating_sub(DDO_WRITE_OVERHEAD));
            if take == 0 {
                return Err(Error::MisconfiguredTag(format!(
                    "mlc {:#06x} cannot carry a wrapped update",
                    self.mlc
                )));
            }
            let cmd = ApduCommand::update_binary_ddo(offset as u32, &data[..take])?;
            transceive(t, &cmd, self.extended)?;
            Ok(take)
        }
    }

    fn read_nlen(&self, t: &mut dyn TagTransport) -> Result<usize> {
        let raw = transceive(
            t,
            &ApduCommand::read_binary(0, self.len_width),
            self.extended,
        )?;
        crate::tlv::ensure_len(&raw, self.len_width)?;
        Ok(raw[..self.len_width]
            .iter()
            .fold(0usize, |acc, &b| acc << 8 | usize::from(b)))
    }

    fn write_nlen(&self, t: &mut dyn TagTransport, len: usize) -> Result<()> {
        let bytes: Vec<u8> = (0..self.len_width)
            .rev()
            .map(|shift| (len >> (shift * 8)) as u8)
            .collect();
        transceive(
            t,
            &ApduCommand::update_binary(0, &bytes),
            self.extended,
        )?;
        Ok(())
    }

    /// Select the NDEF application, parse the CC file and validate the
    /// NDEF file's length field.
    pub fn check(&mut self, t: &mut dyn TagTransport, cfg: &mut TagConfig) -> Result<Detection> {
        self.establish(t, cfg)?;
        let nlen = self.read_nlen(t)?;
        if nlen > self.capacity() {
            return Err(Error::MisconfiguredTag(format!(
                "nlen {} exceeds the {} byte file body",
                nlen,
                self.capacity()
            )));
        }
        if nlen == 0 && !self.writable {
            return Err(Error::MisconfiguredTag(
                "empty ndef file on a read-only tag".to_string(),
            ));
        }
        self.ndef_len = nlen;
        cfg.ndef_file_id = self.file_id;
        cfg.max_file_size = self.max_file_size as u32;
        cfg.mle = self.mle.min(0xFFFF) as u16;
        cfg.mlc = self.mlc.min(0xFFFF) as u16;

        let state = if !self.writable {
            TagState::ReadOnly
        } else if nlen == 0 {
            TagState::Initialized
        } else {
            TagState::ReadWrite
        };
        Ok(Detection {
            state,
            version: self.mapping_version,
            ndef_len: nlen,
            max_ndef_len: self.capacity(),
        })
    }

    /// Read the message body in MLe-bounded chunks.
    pub fn read(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig) -> Result<Vec<u8>> {
        self.require_established()?;
        let mut out = Vec::with_capacity(self.ndef_len);
        let mut offset = self.len_width;
        while out.len() < self.ndef_len {
            let chunk = self.read_chunk(t, offset, self.ndef_len - out.len())?;
            if chunk.is_empty() {
                return Err(Error::MisconfiguredTag(format!(
                    "short read at file offset {:#x}",
                    offset
                )));
            }
            crate::apdu::response::accumulate(&mut out, &chunk, MAX_NDEF_LEN)?;
            offset += chunk.len();
        }
        out.truncate(self.ndef_len);
        Ok(out)
    }

    /// Replace the message body in MLc-bounded chunks.
    pub fn write(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig, data: &[u8]) -> Result<()> {
        self.require_established()?;
        if data.len() > self.capacity() {
            return Err(Error::BufferOverflow {
                needed: data.len(),
                capacity: self.capacity(),
            });
        }

        // Zero the length first: a tear mid-transfer must not leave a
        // stale length over fresh bytes.
        self.write_nlen(t, 0)?;
        let mut offset = self.len_width;
        let mut rest = data;
        while !rest.is_empty() {
            let written = self.write_chunk(t, offset, rest)?;
            offset += written;
            rest = &rest[written..];
        }
        self.write_nlen(t, data.len())?;
        self.ndef_len = data.len();
        debug!("t4t wrote {} bytes", data.len());
        Ok(())
    }

    /// Zero the length field, NLEN or ENLEN per the mapping version.
    pub fn erase(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig) -> Result<()> {
        self.require_established()?;
        self.write_nlen(t, 0)?;
        self.ndef_len = 0;
        Ok(())
    }

    /// Write an empty message into an already provisioned NDEF file. The
    /// file and CC structure come from the card issuer; this only resets
    /// the content.
    pub fn format(&mut self, t: &mut dyn TagTransport, cfg: &TagConfig) -> Result<()> {
        self.establish(t, cfg)?;
        let mut body: Vec<u8> = (0..self.len_width)
            .rev()
            .map(|shift| (crate::constants::EMPTY_NDEF_MESSAGE.len() >> (shift * 8)) as u8)
            .collect();
        body.extend_from_slice(&crate::constants::EMPTY_NDEF_MESSAGE);
        transceive(t, &ApduCommand::update_binary(0, &body), self.extended)?;
        debug!("t4t formatted file {:#06x}", self.file_id);
        Ok(())
    }

    /// Flip the write-access byte in the CC file to the denied value,
    /// then reselect the NDEF file.
    pub fn set_read_only(&mut self, t: &mut dyn TagTransport, _cfg: &TagConfig) -> Result<()> {
        self.require_established()?;
        transceive(t, &ApduCommand::select_by_id(CC_FILE_ID), self.extended)?;
        transceive(
            t,
            &ApduCommand::update_binary(self.write_access_offset as u16, &[0xFF]),
            self.extended,
        )?;
        transceive(t, &ApduCommand::select_by_id(self.file_id), self.extended)?;
        self.writable = false;
        Ok(())
    }
}
