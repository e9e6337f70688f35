// ndeftag/src/apdu/ber.rs
//! BER-TLV helpers for the Type 4 Tag extended addressing data objects:
//! the Offset Data Object (tag 0x54) carrying a 3-byte file offset and the
//! Data Object (tag 0x53) wrapping read/written file content.

use crate::constants::{BER_TAG_DDO, BER_TAG_ODO};
use crate::{Error, Result};

/// Encode a BER-TLV length: one byte below 0x80, `0x81` + one byte up to
/// 0xFF, `0x82` + two bytes beyond.
pub fn encode_len(len: usize) -> Result<Vec<u8>> {
    match len {
        0..=0x7F => Ok(vec![len as u8]),
        0x80..=0xFF => Ok(vec![0x81, len as u8]),
        0x100..=0xFFFF => Ok(vec![0x82, (len >> 8) as u8, (len & 0xFF) as u8]),
        _ => Err(Error::InvalidParameter(format!(
            "ber length {} out of range",
            len
        ))),
    }
}

/// Parse a BER-TLV length, returning `(length, bytes consumed)`.
pub fn parse_len(data: &[u8]) -> Result<(usize, usize)> {
    let first = *data.first().ok_or(Error::InvalidLength {
        expected: 1,
        actual: 0,
    })?;
    match first {
        0x00..=0x7F => Ok((first as usize, 1)),
        0x81 => {
            crate::tlv::ensure_len(data, 2)?;
            Ok((data[1] as usize, 2))
        }
        0x82 => {
            crate::tlv::ensure_len(data, 3)?;
            Ok((usize::from(data[1]) << 8 | usize::from(data[2]), 3))
        }
        other => Err(Error::MisconfiguredTag(format!(
            "unsupported ber length form {:#04x}",
            other
        ))),
    }
}

/// Build an Offset Data Object: `54 03` plus a big-endian 3-byte offset.
pub fn encode_odo(offset: u32) -> [u8; 5] {
    [
        BER_TAG_ODO,
        0x03,
        (offset >> 16) as u8,
        (offset >> 8) as u8,
        offset as u8,
    ]
}

/// Parse an Offset Data Object from a command body, returning the
/// 3-byte big-endian offset.
pub fn parse_odo(data: &[u8]) -> Result<u32> {
    crate::tlv::ensure_len(data, 5)?;
    if data[0] != BER_TAG_ODO || data[1] != 0x03 {
        return Err(Error::MisconfiguredTag(format!(
            "expected odo header 54 03, got {:#04x} {:#04x}",
            data[0], data[1]
        )));
    }
    Ok(u32::from(data[2]) << 16 | u32::from(data[3]) << 8 | u32::from(data[4]))
}

/// Wrap `data` in a Data Object: `53 <ber-len> data`.
pub fn encode_ddo(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(4 + data.len());
    out.push(BER_TAG_DDO);
    out.extend_from_slice(&encode_len(data.len())?);
    out.extend_from_slice(data);
    Ok(out)
}

/// Unwrap a Data Object from a response body, returning the content bytes.
pub fn parse_ddo(data: &[u8]) -> Result<&[u8]> {
    let tag = *data.first().ok_or(Error::InvalidLength {
        expected: 2,
        actual: data.len(),
    })?;
    if tag != BER_TAG_DDO {
        return Err(Error::MisconfiguredTag(format!(
            "expected ddo tag 0x53, got {:#04x}",
            tag
        )));
    }
    let (len, consumed) = parse_len(&data[1..])?;
    let start = 1 + consumed;
    crate::tlv::ensure_len(data, start + len)?;
    Ok(&data[start..start + len])
}
