// ndeftag/src/apdu/response.rs

use crate::{Error, Result};

/// Parsed response APDU: data field plus the trailing SW1SW2 word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    /// Response data field, SW excluded
    pub data: Vec<u8>,
    /// Status word, SW1 in the high byte
    pub sw: u16,
}

impl ApduResponse {
    /// Split raw transport bytes into data and status word.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() < 2 {
            return Err(Error::InvalidLength {
                expected: 2,
                actual: raw.len(),
            });
        }
        let (data, sw) = raw.split_at(raw.len() - 2);
        Ok(Self {
            data: data.to_vec(),
            sw: u16::from(sw[0]) << 8 | u16::from(sw[1]),
        })
    }

    /// Map the status word through the fixed table, returning the data
    /// field on success.
    pub fn into_checked_data(self) -> Result<Vec<u8>> {
        crate::apdu::status::check(self.sw)?;
        Ok(self.data)
    }
}

/// Append one response chunk to an owned accumulation buffer with an
/// explicit bound, for loops that gather a body over several exchanges.
pub fn accumulate(target: &mut Vec<u8>, chunk: &[u8], max: usize) -> Result<()> {
    let needed = target.len() + chunk.len();
    if needed > max {
        return Err(Error::BufferOverflow {
            needed,
            capacity: max,
        });
    }
    target.extend_from_slice(chunk);
    Ok(())
}
