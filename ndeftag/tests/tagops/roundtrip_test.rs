// Write/read/erase cycles across every tag platform, driven through the
// public TagContext surface only.

use crate::common::fixtures::*;
use ndeftag::prelude::*;

fn roundtrip(mut ctx: TagContext, sizes: &[usize]) {
    init_logs();
    assert_eq!(ctx.check_ndef().unwrap(), TagState::Initialized);
    for &len in sizes {
        let msg = pattern_message(len);
        ctx.write_ndef(&msg).unwrap();
        assert_eq!(ctx.state(), TagState::ReadWrite);
        assert_eq!(ctx.ndef_len(), len);
        assert_eq!(ctx.read_ndef().unwrap(), msg);
    }
    ctx.erase_ndef().unwrap();
    assert_eq!(ctx.state(), TagState::Initialized);
    assert!(matches!(ctx.read_ndef(), Err(Error::EmptyNdef)));
}

#[test]
fn type1_roundtrip() {
    let ctx = t1t_context();
    // Static 120-byte tag holds 90 message bytes
    roundtrip(ctx, &[1, 8, 89, 90]);
}

#[test]
fn type2_roundtrip() {
    roundtrip(t2t_context(48), &[1, 4, 45, 46]);
}

#[test]
fn type3_roundtrip() {
    // 6 data blocks: 96 message bytes
    roundtrip(t3t_context(6), &[1, 16, 17, 96]);
}

#[test]
fn type5_roundtrip() {
    // 64-byte area behind the 4-byte CC: 62 message bytes
    roundtrip(t5t_context(4, 64, 0x00), &[1, 4, 61, 62]);
}

#[test]
fn type5_roundtrip_eight_byte_blocks() {
    roundtrip(t5t_context(8, 248, 0x00), &[1, 7, 8, 9, 246]);
}

#[test]
fn type4_roundtrip() {
    let mut ctx = t4t_context(64, &[]);
    init_logs();
    assert_eq!(ctx.check_ndef().unwrap(), TagState::Initialized);
    for &len in &[1usize, 32, 62] {
        let msg = pattern_message(len);
        ctx.write_ndef(&msg).unwrap();
        assert_eq!(ctx.read_ndef().unwrap(), msg);
    }
    ctx.erase_ndef().unwrap();
    assert!(matches!(ctx.read_ndef(), Err(Error::EmptyNdef)));
}

#[test]
fn mifare_roundtrip() {
    // Two mapped sectors: 96 logical bytes, 94 for the message
    roundtrip(mfc_context(&[1, 2]), &[1, 16, 93, 94]);
}

#[test]
fn text_record_survives_every_platform() {
    init_logs();
    let msg = text_record();
    let contexts: Vec<TagContext> = vec![
        t1t_context(),
        t2t_context(48),
        t3t_context(6),
        t5t_context(4, 64, 0x00),
        t4t_context(64, &[]),
        mfc_context(&[1]),
    ];
    for mut ctx in contexts {
        ctx.check_ndef().unwrap();
        ctx.write_ndef(&msg).unwrap();
        assert_eq!(ctx.read_ndef().unwrap(), msg, "{}", ctx.tag_type());
    }
}

#[test]
fn rewrite_shrinks_and_grows() {
    init_logs();
    let mut ctx = t2t_context(128);
    ctx.check_ndef().unwrap();

    ctx.write_ndef(&pattern_message(100)).unwrap();
    ctx.write_ndef(&pattern_message(5)).unwrap();
    assert_eq!(ctx.read_ndef().unwrap(), pattern_message(5));

    // Stale bytes from the longer message must not leak back in after a
    // fresh detection either.
    ctx.reset().unwrap();
    assert_eq!(ctx.check_ndef().unwrap(), TagState::ReadWrite);
    assert_eq!(ctx.ndef_len(), 5);
    assert_eq!(ctx.read_ndef().unwrap(), pattern_message(5));
}
