// ndeftag/src/constants.rs
//! Common on-tag constants used across the crate

/// TLV tag byte: NULL (single padding byte, no length field)
pub const TLV_NULL: u8 = 0x00;
/// TLV tag byte: Lock Control
pub const TLV_LOCK_CONTROL: u8 = 0x01;
/// TLV tag byte: Memory Control
pub const TLV_MEMORY_CONTROL: u8 = 0x02;
/// TLV tag byte: NDEF Message
pub const TLV_NDEF: u8 = 0x03;
/// TLV tag byte: Proprietary
pub const TLV_PROPRIETARY: u8 = 0xFD;
/// TLV tag byte: Terminator (single byte, ends the data area)
pub const TLV_TERMINATOR: u8 = 0xFE;

/// Escape value in a 1-byte TLV length field selecting the 3-byte form
pub const TLV_LEN_ESCAPE: u8 = 0xFF;

/// Maximum number of consecutive NULL TLVs tolerated during a scan
pub const MAX_NULL_TLV_RUN: usize = 3;

/// Capability Container magic number for Type 1/2/5 tags (1-byte addressing)
pub const CC_MAGIC: u8 = 0xE1;
/// Type 5 Tag CC magic selecting 2-byte ("extended") block addressing
pub const CC_MAGIC_EXTENDED: u8 = 0xE2;

/// Highest mapping version major number this implementation accepts for
/// Type 1/2/5 tags (1.x)
pub const SUPPORTED_MAJOR_VERSION: u8 = 1;

/// Global upper bound on NDEF message size, enforced before any read or
/// write loop regardless of what a tag claims.
pub const MAX_NDEF_LEN: usize = 8192;

/// Minimal empty NDEF record: MB|ME, TNF=Empty, no type, no payload
pub const EMPTY_NDEF_MESSAGE: [u8; 3] = [0xD0, 0x00, 0x00];

/// Type 1 Tag block size in bytes
pub const T1T_BLOCK_SIZE: usize = 8;
/// Type 2 Tag block size in bytes
pub const T2T_BLOCK_SIZE: usize = 4;
/// Type 3 Tag (FeliCa) block size in bytes
pub const T3T_BLOCK_SIZE: usize = 16;
/// MIFARE Classic block size in bytes
pub const MFC_BLOCK_SIZE: usize = 16;

/// Type 2 Tag sector size in bytes; crossing it requires a sector select
pub const T2T_SECTOR_SIZE: usize = 1024;

/// Type 1 Tag capability container address (block 1)
pub const T1T_CC_ADDR: usize = 8;
/// Type 1 Tag data area start
pub const T1T_DATA_ADDR: usize = 12;
/// Start of the Type 1 Tag reserved blocks 0x0D-0x0E, never part of the
/// data stream
pub const T1T_RESERVED_ADDR: usize = 104;
/// Length of the Type 1 Tag reserved blocks
pub const T1T_RESERVED_LEN: usize = 16;
/// Type 1 Tag static lock bytes (block 0x0E, bytes 0-1)
pub const T1T_STATIC_LOCK_ADDR: usize = 112;

/// Type 2 Tag capability container address (block 3)
pub const T2T_CC_ADDR: usize = 12;
/// Type 2 Tag data area start
pub const T2T_DATA_ADDR: usize = 16;
/// Type 2 Tag static lock bytes (block 2, bytes 2-3)
pub const T2T_STATIC_LOCK_ADDR: usize = 10;

/// Type 3 Tag attribute block write-flag marker: write in progress
pub const T3T_WRITE_FLAG_BUSY: u8 = 0x0F;
/// Type 3 Tag attribute block write-flag marker: write complete
pub const T3T_WRITE_FLAG_DONE: u8 = 0x00;

/// Type 5 Tag CC feature flag: multiple-block read supported
pub const T5T_FLAG_MBREAD: u8 = 0x01;
/// Type 5 Tag CC feature flag: per-block lock command supported
pub const T5T_FLAG_LOCK_BLOCK: u8 = 0x08;

/// ISO7816-4 instruction byte: SELECT
pub const INS_SELECT: u8 = 0xA4;
/// ISO7816-4 instruction byte: READ BINARY, offset in P1/P2
pub const INS_READ_BINARY: u8 = 0xB0;
/// ISO7816-4 instruction byte: READ BINARY with an Offset Data Object
pub const INS_READ_BINARY_ODO: u8 = 0xB1;
/// ISO7816-4 instruction byte: UPDATE BINARY, offset in P1/P2
pub const INS_UPDATE_BINARY: u8 = 0xD6;
/// ISO7816-4 instruction byte: UPDATE BINARY in the wrapped form
pub const INS_UPDATE_BINARY_DDO: u8 = 0xD7;

/// NDEF Tag Application name (DF name for application select)
pub const NDEF_APP_NAME: [u8; 7] = [0xD2, 0x76, 0x00, 0x00, 0x85, 0x01, 0x01];
/// Capability Container file identifier
pub const CC_FILE_ID: u16 = 0xE103;
/// Default NDEF file identifier
pub const DEFAULT_NDEF_FILE_ID: u16 = 0xE104;

/// BER-TLV tag of the Data Object wrapping file content
pub const BER_TAG_DDO: u8 = 0x53;
/// BER-TLV tag of the Offset Data Object carrying a 3-byte file offset
pub const BER_TAG_ODO: u8 = 0x54;

/// Largest file offset reachable with a plain short READ/UPDATE BINARY;
/// beyond this the ODO/DDO wrapped forms are required.
pub const T4T_MAX_PLAIN_OFFSET: u32 = 0x7FFF;

/// Minimum legal NDEF file size under mapping version 2: the 2-byte
/// NLEN plus the smallest NDEF message
pub const T4T_MIN_FILE_SIZE_MV2: u32 = 0x0005;
/// Minimum legal NDEF file size under mapping version 3: the 4-byte
/// ENLEN plus the smallest NDEF message
pub const T4T_MIN_FILE_SIZE_MV3: u32 = 0x0007;
/// Minimum legal MLe a Type 4 Tag CC may advertise
pub const T4T_MIN_MLE: u16 = 0x000F;
/// Minimum legal MLc a Type 4 Tag CC may advertise
pub const T4T_MIN_MLC: u16 = 0x000D;

/// MIFARE Application Directory AID registered for NFC Forum NDEF data
pub const MAD_NDEF_AID: u16 = 0x03E1;
