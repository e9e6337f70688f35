// fixtures.rs — canned tag images and ready-made contexts

use ndeftag::constants::{
    MFC_BLOCK_SIZE, T1T_BLOCK_SIZE, T1T_CC_ADDR, T1T_DATA_ADDR, T2T_BLOCK_SIZE, T2T_CC_ADDR,
    T2T_DATA_ADDR, T3T_BLOCK_SIZE,
};
use ndeftag::prelude::*;
use ndeftag::transport::mock::{MemoryTag, Type4Emulator};

pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An opaque message of the requested length. The first byte looks like
/// an NDEF record header so images read plausibly in hex dumps; the tag
/// operation layer never parses the content.
pub fn pattern_message(len: usize) -> Vec<u8> {
    let mut msg: Vec<u8> = (0..len).map(|i| (0x20 + i % 0x5F) as u8).collect();
    if !msg.is_empty() {
        msg[0] = 0xD1;
    }
    msg
}

/// A well-formed "T" record, `en` language, text `hello!!`.
pub fn text_record() -> Vec<u8> {
    hex::decode("d1010a5402656e68656c6c6f2121").unwrap()
}

/// Static Topaz-style Type 1 image: 120 bytes, empty message TLV.
pub fn t1t_image() -> MemoryTag {
    let mut tag = MemoryTag::new(120, T1T_BLOCK_SIZE);
    tag.image[T1T_CC_ADDR..T1T_CC_ADDR + 4].copy_from_slice(&[0xE1, 0x10, 0x0E, 0x00]);
    tag.image[T1T_DATA_ADDR] = 0x03;
    tag.image[T1T_DATA_ADDR + 1] = 0x00;
    tag
}

pub fn t1t_context() -> TagContext {
    TagContext::new(TagType::Type1, Box::new(t1t_image())).unwrap()
}

/// Type 2 image with `data_size` bytes behind the capability container
/// and an empty message TLV at the start of the data area.
pub fn t2t_image(data_size: usize) -> MemoryTag {
    assert_eq!(data_size % 8, 0, "t2t data areas come in 8 byte units");
    let mut tag = MemoryTag::new(T2T_DATA_ADDR + data_size, T2T_BLOCK_SIZE);
    tag.image[T2T_CC_ADDR..T2T_DATA_ADDR]
        .copy_from_slice(&[0xE1, 0x10, (data_size / 8) as u8, 0x00]);
    tag.image[T2T_DATA_ADDR] = 0x03;
    tag.image[T2T_DATA_ADDR + 1] = 0x00;
    tag
}

pub fn t2t_context(data_size: usize) -> TagContext {
    TagContext::new(TagType::Type2, Box::new(t2t_image(data_size))).unwrap()
}

fn t3t_checksum(attr: &[u8; 16]) -> u16 {
    attr[..14].iter().fold(0u16, |sum, &b| sum.wrapping_add(u16::from(b)))
}

/// Type 3 image: attribute block in block 0 with a valid checksum,
/// `nmaxb` data blocks behind it.
pub fn t3t_image(nbr: u8, nbw: u8, nmaxb: u16, ln: usize, rw: u8) -> MemoryTag {
    let mut attr = [0u8; 16];
    attr[0] = 0x10;
    attr[1] = nbr;
    attr[2] = nbw;
    attr[3] = (nmaxb >> 8) as u8;
    attr[4] = nmaxb as u8;
    attr[10] = rw;
    attr[11] = (ln >> 16) as u8;
    attr[12] = (ln >> 8) as u8;
    attr[13] = ln as u8;
    let sum = t3t_checksum(&attr);
    attr[14..].copy_from_slice(&sum.to_be_bytes());

    let mut tag = MemoryTag::new((1 + usize::from(nmaxb)) * T3T_BLOCK_SIZE, T3T_BLOCK_SIZE);
    tag.image[..T3T_BLOCK_SIZE].copy_from_slice(&attr);
    tag
}

pub fn t3t_context(nmaxb: u16) -> TagContext {
    TagContext::new(TagType::Type3, Box::new(t3t_image(4, 2, nmaxb, 0, 0x01))).unwrap()
}

/// Type 5 image with a 4-byte capability container and an empty message
/// TLV behind it.
pub fn t5t_image(block_size: usize, area_size: usize, flags: u8) -> MemoryTag {
    let mut tag = MemoryTag::new((4 + area_size).div_ceil(block_size) * block_size, block_size);
    tag.image[..4].copy_from_slice(&[0xE1, 0x40, (area_size / 8) as u8, flags]);
    tag.image[4] = 0x03;
    tag.image[5] = 0x00;
    tag
}

pub fn t5t_context(block_size: usize, area_size: usize, flags: u8) -> TagContext {
    TagContext::new(TagType::Type5, Box::new(t5t_image(block_size, area_size, flags))).unwrap()
}

/// MIFARE Classic 1K image: MAD in sector 0 naming `sectors` for NDEF,
/// NDEF sector trailers at v1.0 read/write, empty message TLV at the
/// start of the mapped area.
pub fn mfc_image(sectors: &[u8]) -> MemoryTag {
    let mut tag = MemoryTag::new(1024, MFC_BLOCK_SIZE);
    tag.image[3 * 16 + 9] = 0x80 | 0x40; // MAD present, v1
    for &s in sectors {
        let off = 16 + usize::from(s) * 2;
        tag.image[off] = 0x03;
        tag.image[off + 1] = 0xE1;
    }
    let crc = ndeftag::tag::mfc::mad_crc(&tag.image[17..48]);
    tag.image[16] = crc;
    for &s in sectors {
        tag.image[usize::from(s) * 64 + 48 + 9] = 0x40;
    }
    let first = usize::from(sectors[0]) * 64;
    tag.image[first] = 0x03;
    tag.image[first + 1] = 0x00;
    tag
}

pub fn mfc_context(sectors: &[u8]) -> TagContext {
    TagContext::new(TagType::MifareClassic, Box::new(mfc_image(sectors))).unwrap()
}

/// Mapping version 2 capability container file for a Type 4 emulator.
pub fn t4t_cc_mv2(mle: u16, mlc: u16, file_size: u16, write_access: u8) -> Vec<u8> {
    let mut cc = vec![0x00, 0x0F, 0x20];
    cc.extend_from_slice(&mle.to_be_bytes());
    cc.extend_from_slice(&mlc.to_be_bytes());
    cc.push(0x04);
    cc.push(0x06);
    cc.extend_from_slice(&0xE104u16.to_be_bytes());
    cc.extend_from_slice(&file_size.to_be_bytes());
    cc.push(0x00);
    cc.push(write_access);
    cc
}

/// Mapping version 3 capability container file with the extended NDEF
/// file control TLV.
pub fn t4t_cc_mv3(mle: u16, mlc: u16, file_size: u32) -> Vec<u8> {
    let mut cc = vec![0x00, 0x11, 0x30];
    cc.extend_from_slice(&mle.to_be_bytes());
    cc.extend_from_slice(&mlc.to_be_bytes());
    cc.push(0x06);
    cc.push(0x08);
    cc.extend_from_slice(&0xE104u16.to_be_bytes());
    cc.extend_from_slice(&file_size.to_be_bytes());
    cc.push(0x00);
    cc.push(0x00);
    cc
}

/// NDEF file body: 2-byte NLEN followed by `msg`, zero padded to `size`.
pub fn t4t_ndef_file(size: usize, msg: &[u8]) -> Vec<u8> {
    let mut file = vec![0u8; size];
    file[..2].copy_from_slice(&(msg.len() as u16).to_be_bytes());
    file[2..2 + msg.len()].copy_from_slice(msg);
    file
}

pub fn t4t_context(file_size: u16, msg: &[u8]) -> TagContext {
    let emu = Type4Emulator::new(
        t4t_cc_mv2(0x00FF, 0x00FF, file_size, 0x00),
        t4t_ndef_file(usize::from(file_size), msg),
        0xE104,
    );
    TagContext::new(TagType::Type4, Box::new(emu)).unwrap()
}
