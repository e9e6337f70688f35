// Type 4 Tag paths that only show up above the session layer: config
// plumbing for the APDU encoding, both mapping versions, and CC-driven
// read-only behavior, all against the file-level emulator.

use crate::common::fixtures::*;
use ndeftag::prelude::*;
use ndeftag::transport::mock::Type4Emulator;

#[test]
fn mapping_version_2_detection() {
    init_logs();
    let mut ctx = t4t_context(0x0100, &text_record());
    assert_eq!(ctx.check_ndef().unwrap(), TagState::ReadWrite);
    assert_eq!(ctx.version() >> 4, 2);
    assert_eq!(ctx.ndef_len(), text_record().len());
    assert_eq!(ctx.max_ndef_len(), 0x0100 - 2);
    assert_eq!(ctx.read_ndef().unwrap(), text_record());
}

#[test]
fn mapping_version_3_detection() {
    init_logs();
    let emu = Type4Emulator::new(
        t4t_cc_mv3(0x00FF, 0x00FF, 0x0200),
        {
            let mut file = vec![0u8; 0x0200];
            let msg = text_record();
            file[3] = msg.len() as u8; // 4-byte ENLEN
            file[4..4 + msg.len()].copy_from_slice(&msg);
            file
        },
        0xE104,
    );
    let mut ctx = TagContext::new(TagType::Type4, Box::new(emu)).unwrap();
    assert_eq!(ctx.check_ndef().unwrap(), TagState::ReadWrite);
    assert_eq!(ctx.version() >> 4, 3);
    assert_eq!(ctx.max_ndef_len(), 0x0200 - 4);
    assert_eq!(ctx.read_ndef().unwrap(), text_record());
}

#[test]
fn detection_adopts_cc_limits_into_config() {
    init_logs();
    let emu = Type4Emulator::new(
        t4t_cc_mv2(0x0020, 0x0010, 0x0100, 0x00),
        t4t_ndef_file(0x0100, &[]),
        0xE104,
    );
    let mut ctx = TagContext::new(TagType::Type4, Box::new(emu)).unwrap();
    ctx.check_ndef().unwrap();
    assert_eq!(ctx.get_config(ConfigKey::Mle).unwrap(), 0x0020);
    assert_eq!(ctx.get_config(ConfigKey::Mlc).unwrap(), 0x0010);
    assert_eq!(ctx.get_config(ConfigKey::MaxFileSize).unwrap(), 0x0100);
    assert_eq!(ctx.get_config(ConfigKey::NdefFileId).unwrap(), 0xE104);

    // Tight limits force chunked transfers; the message still roundtrips
    let msg = pattern_message(120);
    ctx.write_ndef(&msg).unwrap();
    assert_eq!(ctx.read_ndef().unwrap(), msg);
}

#[test]
fn extended_apdu_encoding_end_to_end() {
    init_logs();
    let mut emu = Type4Emulator::new(
        t4t_cc_mv2(0x01FF, 0x01FF, 0x0400, 0x00),
        t4t_ndef_file(0x0400, &[]),
        0xE104,
    );
    emu.extended = true;
    let mut ctx = TagContext::new(TagType::Type4, Box::new(emu)).unwrap();
    ctx.set_config(ConfigKey::ExtendedApdu, 1).unwrap();
    ctx.check_ndef().unwrap();

    let msg = pattern_message(700);
    ctx.write_ndef(&msg).unwrap();
    assert_eq!(ctx.read_ndef().unwrap(), msg);
}

#[test]
fn nonstandard_ndef_file_id() {
    init_logs();
    let mut cc = t4t_cc_mv2(0x00FF, 0x00FF, 0x0080, 0x00);
    cc[9..11].copy_from_slice(&0xE105u16.to_be_bytes());
    let emu = Type4Emulator::new(cc, t4t_ndef_file(0x0080, &[]), 0xE105);
    let mut ctx = TagContext::new(TagType::Type4, Box::new(emu)).unwrap();
    ctx.check_ndef().unwrap();
    // Detection adopted the advertised identifier
    assert_eq!(ctx.get_config(ConfigKey::NdefFileId).unwrap(), 0xE105);
    ctx.write_ndef(&text_record()).unwrap();
    assert_eq!(ctx.read_ndef().unwrap(), text_record());
}

#[test]
fn nlen_beyond_file_body_rejected() {
    init_logs();
    let mut file = t4t_ndef_file(0x0040, &[]);
    file[..2].copy_from_slice(&0x0100u16.to_be_bytes());
    let emu = Type4Emulator::new(t4t_cc_mv2(0x00FF, 0x00FF, 0x0040, 0x00), file, 0xE104);
    let mut ctx = TagContext::new(TagType::Type4, Box::new(emu)).unwrap();
    assert!(matches!(ctx.check_ndef(), Err(Error::MisconfiguredTag(_))));
    assert_eq!(ctx.state(), TagState::None);
}

#[test]
fn cc_write_access_denied_is_read_only() {
    init_logs();
    let emu = Type4Emulator::new(
        t4t_cc_mv2(0x00FF, 0x00FF, 0x0040, 0xFF),
        t4t_ndef_file(0x0040, &text_record()),
        0xE104,
    );
    let mut ctx = TagContext::new(TagType::Type4, Box::new(emu)).unwrap();
    assert_eq!(ctx.check_ndef().unwrap(), TagState::ReadOnly);
    assert!(matches!(
        ctx.write_ndef(&text_record()),
        Err(Error::ReadOnlyTag)
    ));
}

#[test]
fn read_only_transition_patches_the_cc_file() {
    init_logs();
    let mut ctx = t4t_context(0x0040, &text_record());
    ctx.check_ndef().unwrap();
    ctx.set_config(ConfigKey::ReadOnly, 1).unwrap();
    assert_eq!(ctx.state(), TagState::ReadOnly);

    // A fresh detection reads the patched access byte off the card
    ctx.reset().unwrap();
    assert_eq!(ctx.check_ndef().unwrap(), TagState::ReadOnly);
    assert_eq!(ctx.read_ndef().unwrap(), text_record());
}

#[test]
fn advertised_file_missing_fails_detection() {
    init_logs();
    let mut emu = Type4Emulator::new(
        t4t_cc_mv2(0x00FF, 0x00FF, 0x0040, 0x00),
        t4t_ndef_file(0x0040, &[]),
        0xE104,
    );
    // The CC points at 0xE104 but the card only serves 0xAAAA
    emu.ndef_file_id = 0xAAAA;
    let mut ctx = TagContext::new(TagType::Type4, Box::new(emu)).unwrap();
    assert!(ctx.check_ndef().is_err());
    assert_eq!(ctx.state(), TagState::None);
}
