// ndeftag/src/apdu/status.rs
//! PICC status word handling. Known SW1SW2 values map into the shared
//! error taxonomy; everything else falls back to a generic class carrying
//! the raw status word for diagnostics.

use crate::{Error, Result};

/// Normal completion
pub const SW_OK: u16 = 0x9000;
/// File or application not found
pub const SW_FILE_NOT_FOUND: u16 = 0x6A82;
/// Security status not satisfied
pub const SW_SECURITY_STATUS: u16 = 0x6982;
/// Conditions of use not satisfied
pub const SW_CONDITIONS_NOT_SATISFIED: u16 = 0x6985;
/// Wrong length
pub const SW_WRONG_LENGTH: u16 = 0x6700;
/// Incorrect P1/P2
pub const SW_WRONG_P1P2: u16 = 0x6A86;
/// Lc inconsistent with P1/P2
pub const SW_LC_INCONSISTENT: u16 = 0x6A87;
/// End of file reached before Le bytes
pub const SW_EOF_BEFORE_LE: u16 = 0x6282;

/// Check a status word against the fixed mapping table.
pub fn check(sw: u16) -> Result<()> {
    match sw {
        SW_OK | SW_EOF_BEFORE_LE => Ok(()),
        SW_FILE_NOT_FOUND => Err(Error::NonNdefTag),
        SW_SECURITY_STATUS | SW_CONDITIONS_NOT_SATISFIED => Err(Error::ReadOnlyTag),
        SW_WRONG_LENGTH | SW_WRONG_P1P2 | SW_LC_INCONSISTENT => Err(Error::InvalidParameter(
            format!("picc rejected apdu: sw={:#06x}", sw),
        )),
        other => Err(Error::ApduStatus(other)),
    }
}
