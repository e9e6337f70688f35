// ndeftag/src/tag/area.rs
//! Shared data-area engine for the TLV-addressed tag platforms (Type 1,
//! Type 2, Type 5 and the MIFARE Classic mapping). Holds the scan result
//! for the session and drives message read/write/erase with the length
//! update ordering the platforms require: the length field is zeroed
//! before the payload lands and only written back once the payload is
//! complete.

use log::debug;

use crate::constants::{TLV_LEN_ESCAPE, TLV_NDEF, TLV_TERMINATOR};
use crate::tlv::SkipMap;
use crate::transport::{self, TagTransport};
use crate::types::{LockControlTlv, NdefLocation};
use crate::{Error, Result};

/// One detected TLV data area: byte range, reserved-byte skip map and the
/// NDEF TLV location the scan produced.
#[derive(Debug, Default, Clone)]
pub(crate) struct TlvArea {
    pub end: usize,
    pub skip: SkipMap,
    pub ndef: Option<NdefLocation>,
    pub locks: Vec<LockControlTlv>,
}

impl TlvArea {
    /// Scan `[start, end)` and build the session's area description.
    /// `extra_skip` carries platform-fixed reserved ranges that no control
    /// TLV announces (the Type 1 Tag reserved blocks, for instance).
    pub fn detect(
        t: &mut dyn TagTransport,
        start: usize,
        end: usize,
        extra_skip: &[(usize, usize)],
    ) -> Result<Self> {
        let report = crate::tlv::scan(t, start, end)?;
        let mut skip = SkipMap::from_controls(&report.locks, &report.mems);
        for &(addr, len) in extra_skip {
            skip.add(addr, len);
        }
        Ok(Self {
            end,
            skip,
            ndef: report.ndef,
            locks: report.locks,
        })
    }

    fn require_ndef(&self) -> Result<NdefLocation> {
        self.ndef.ok_or(Error::NonNdefTag)
    }

    /// Largest message the area can hold with the NDEF TLV header at its
    /// detected position, accounting for the length-field width the
    /// message size forces.
    pub fn capacity(&self) -> usize {
        let Some(loc) = self.ndef else { return 0 };
        let avail = self.skip.data_len(loc.header_addr + 1, self.end);
        let escape = usize::from(TLV_LEN_ESCAPE);
        if avail >= escape + 3 {
            avail - 3
        } else {
            avail.saturating_sub(1).min(escape - 1)
        }
    }

    /// Validate the detected length against the usable bytes behind it.
    pub fn check_length(&self) -> Result<()> {
        let loc = self.require_ndef()?;
        let usable = self.skip.data_len(loc.message_addr, self.end);
        if loc.length > usable {
            return Err(Error::MisconfiguredTag(format!(
                "ndef length {} exceeds the {} usable bytes behind the tlv",
                loc.length, usable
            )));
        }
        Ok(())
    }

    /// Read the whole message the last scan located. `max_chunk` bounds
    /// the bytes fetched per transport exchange; it is floored at one
    /// block.
    pub fn read(&self, t: &mut dyn TagTransport, max_chunk: usize) -> Result<Vec<u8>> {
        let loc = self.require_ndef()?;
        crate::tlv::control::read_data(
            t,
            loc.message_addr,
            self.end,
            &self.skip,
            loc.length,
            max_chunk,
        )
    }

    /// Replace the message. The length field is zeroed first so a tear
    /// mid-write leaves the tag looking initialized rather than carrying
    /// a truncated message.
    pub fn write(
        &mut self,
        t: &mut dyn TagTransport,
        data: &[u8],
        terminator: bool,
    ) -> Result<()> {
        let loc = self.require_ndef()?;
        if data.len() > self.capacity() {
            return Err(Error::BufferOverflow {
                needed: data.len(),
                capacity: self.capacity(),
            });
        }
        let width = NdefLocation::width_for(data.len());
        let message_addr = loc.header_addr + 1 + usize::from(width);

        transport::write_span(t, loc.header_addr + 1, &[0x00])?;
        crate::tlv::control::write_data(t, message_addr, self.end, &self.skip, data)?;
        match width {
            1 => transport::write_span(t, loc.header_addr + 1, &[data.len() as u8])?,
            _ => transport::write_span(
                t,
                loc.header_addr + 1,
                &[
                    TLV_LEN_ESCAPE,
                    (data.len() >> 8) as u8,
                    (data.len() & 0xFF) as u8,
                ],
            )?,
        }

        if terminator && !data.is_empty() {
            // Terminator goes after the last payload byte, if the area
            // still has room for it.
            if let Some(last) = self.skip.nth_data_addr(message_addr, self.end, data.len() - 1) {
                if let Some(term) = self.skip.nth_data_addr(last + 1, self.end, 0) {
                    transport::write_span(t, term, &[TLV_TERMINATOR])?;
                }
            }
        }

        debug!(
            "wrote {} byte message, {}-byte length field at {:#x}",
            data.len(),
            width,
            loc.header_addr + 1
        );
        self.ndef = Some(NdefLocation {
            header_addr: loc.header_addr,
            message_addr,
            length: data.len(),
            len_width: width,
        });
        Ok(())
    }

    /// Zero the length field, leaving the message bytes in place.
    pub fn erase(&mut self, t: &mut dyn TagTransport) -> Result<()> {
        let loc = self.require_ndef()?;
        transport::write_span(t, loc.header_addr + 1, &[0x00])?;
        self.ndef = Some(NdefLocation {
            header_addr: loc.header_addr,
            message_addr: loc.header_addr + 2,
            length: 0,
            len_width: 1,
        });
        Ok(())
    }
}

/// Empty-message TLV stream written by format: `03 03 D0 00 00 FE`.
pub(crate) fn format_tlvs() -> [u8; 6] {
    let m = crate::constants::EMPTY_NDEF_MESSAGE;
    [TLV_NDEF, 0x03, m[0], m[1], m[2], TLV_TERMINATOR]
}
