// ndeftag/src/apdu/command.rs

use crate::constants::{
    INS_READ_BINARY, INS_READ_BINARY_ODO, INS_SELECT, INS_UPDATE_BINARY, INS_UPDATE_BINARY_DDO,
};
use crate::{Error, Result};

/// ISO7816-4 command APDU. Encoding (short vs extended length fields) is
/// chosen at encode time so the same builder serves both modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduCommand {
    /// Class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// First parameter byte
    pub p1: u8,
    /// Second parameter byte
    pub p2: u8,
    /// Command data field; empty means no Lc/data on the wire
    pub data: Vec<u8>,
    /// Expected response data length. `None` means no Le field.
    pub le: Option<usize>,
}

impl ApduCommand {
    /// Select the NDEF Tag Application by DF name.
    pub fn select_by_name(name: &[u8]) -> Self {
        Self {
            cla: 0x00,
            ins: INS_SELECT,
            p1: 0x04,
            p2: 0x00,
            data: name.to_vec(),
            le: Some(256),
        }
    }

    /// Select an elementary file by its 2-byte identifier.
    pub fn select_by_id(file_id: u16) -> Self {
        Self {
            cla: 0x00,
            ins: INS_SELECT,
            p1: 0x00,
            p2: 0x0C,
            data: file_id.to_be_bytes().to_vec(),
            le: None,
        }
    }

    /// READ BINARY with the offset carried in P1/P2 (15-bit reach).
    pub fn read_binary(offset: u16, le: usize) -> Self {
        Self {
            cla: 0x00,
            ins: INS_READ_BINARY,
            p1: (offset >> 8) as u8,
            p2: offset as u8,
            data: Vec::new(),
            le: Some(le),
        }
    }

    /// READ BINARY with an Offset Data Object in the command body; the
    /// response wraps the content in a Data Object.
    pub fn read_binary_odo(offset: u32, le: usize) -> Self {
        Self {
            cla: 0x00,
            ins: INS_READ_BINARY_ODO,
            p1: 0x00,
            p2: 0x00,
            data: crate::apdu::ber::encode_odo(offset).to_vec(),
            le: Some(le),
        }
    }

    /// UPDATE BINARY with the offset in P1/P2.
    pub fn update_binary(offset: u16, content: &[u8]) -> Self {
        Self {
            cla: 0x00,
            ins: INS_UPDATE_BINARY,
            p1: (offset >> 8) as u8,
            p2: offset as u8,
            data: content.to_vec(),
            le: None,
        }
    }

    /// UPDATE BINARY carrying an ODO plus the content wrapped in a DDO.
    pub fn update_binary_ddo(offset: u32, content: &[u8]) -> Result<Self> {
        let mut data = crate::apdu::ber::encode_odo(offset).to_vec();
        data.extend_from_slice(&crate::apdu::ber::encode_ddo(content)?);
        Ok(Self {
            cla: 0x00,
            ins: INS_UPDATE_BINARY_DDO,
            p1: 0x00,
            p2: 0x00,
            data,
            le: None,
        })
    }

    /// Encode into wire bytes. `extended` selects 3-byte Lc and 2/3-byte
    /// Le encodings; the short form limits Lc to 255 and Le to 256.
    pub fn encode(&self, extended: bool) -> Result<Vec<u8>> {
        let mut out = vec![self.cla, self.ins, self.p1, self.p2];

        if extended {
            if !self.data.is_empty() {
                if self.data.len() > 0xFFFF {
                    return Err(Error::InvalidLength {
                        expected: 0xFFFF,
                        actual: self.data.len(),
                    });
                }
                out.push(0x00);
                out.extend_from_slice(&(self.data.len() as u16).to_be_bytes());
                out.extend_from_slice(&self.data);
            }
            if let Some(le) = self.le {
                if le > 0x1_0000 {
                    return Err(Error::InvalidLength {
                        expected: 0x1_0000,
                        actual: le,
                    });
                }
                // Le of 65536 encodes as 0x0000
                let le16 = (le & 0xFFFF) as u16;
                if self.data.is_empty() {
                    out.push(0x00);
                }
                out.extend_from_slice(&le16.to_be_bytes());
            }
        } else {
            if !self.data.is_empty() {
                if self.data.len() > 0xFF {
                    return Err(Error::InvalidLength {
                        expected: 0xFF,
                        actual: self.data.len(),
                    });
                }
                out.push(self.data.len() as u8);
                out.extend_from_slice(&self.data);
            }
            if let Some(le) = self.le {
                if le > 256 {
                    return Err(Error::InvalidLength {
                        expected: 256,
                        actual: le,
                    });
                }
                // Le of 256 encodes as 0x00
                out.push((le & 0xFF) as u8);
            }
        }
        Ok(out)
    }
}
