// Detection classification and the state machine around it: blank vs
// initialized vs read/write vs read-only, format, and the one-way
// read-only transition.

use crate::common::fixtures::*;
use ndeftag::prelude::*;
use ndeftag::transport::mock::MemoryTag;

#[test]
fn blank_tag_fails_detection_cleanly() {
    init_logs();
    let tag = MemoryTag::new(64, 4);
    let mut ctx = TagContext::new(TagType::Type2, Box::new(tag)).unwrap();
    assert!(matches!(ctx.check_ndef(), Err(Error::NonNdefTag)));
    assert_eq!(ctx.state(), TagState::None);
    assert!(matches!(ctx.read_ndef(), Err(Error::InvalidState)));
}

#[test]
fn format_then_detect_per_platform() {
    init_logs();

    // Type 2: blank 64-byte image, 48-byte data area
    let tag = MemoryTag::new(64, 4);
    let mut ctx = TagContext::new(TagType::Type2, Box::new(tag)).unwrap();
    ctx.set_config(ConfigKey::MemorySize, 48).unwrap();
    ctx.format_ndef().unwrap();
    assert_eq!(ctx.check_ndef().unwrap(), TagState::ReadWrite);
    assert_eq!(ctx.ndef_len(), 3);

    // Type 3: blank FeliCa image
    let tag = MemoryTag::new(7 * 16, 16);
    let mut ctx = TagContext::new(TagType::Type3, Box::new(tag)).unwrap();
    ctx.set_config(ConfigKey::MemorySize, 96).unwrap();
    ctx.format_ndef().unwrap();
    assert_eq!(ctx.check_ndef().unwrap(), TagState::ReadWrite);
    assert_eq!(ctx.ndef_len(), 3);

    // Type 5: blank ISO15693 image
    let tag = MemoryTag::new(68, 4);
    let mut ctx = TagContext::new(TagType::Type5, Box::new(tag)).unwrap();
    ctx.set_config(ConfigKey::MemorySize, 64).unwrap();
    ctx.format_ndef().unwrap();
    assert_eq!(ctx.check_ndef().unwrap(), TagState::ReadWrite);
    assert_eq!(ctx.ndef_len(), 3);

    // Type 4: provisioned file, content reset
    let mut ctx = t4t_context(64, &pattern_message(20));
    ctx.format_ndef().unwrap();
    assert_eq!(ctx.check_ndef().unwrap(), TagState::ReadWrite);
    assert_eq!(ctx.ndef_len(), 3);
}

#[test]
fn format_refused_once_detected() {
    init_logs();
    let mut ctx = t2t_context(48);
    ctx.check_ndef().unwrap();
    assert!(matches!(ctx.format_ndef(), Err(Error::FormattedTag)));
}

#[test]
fn read_only_capability_container_classifies() {
    init_logs();

    // Type 2: write access nibble denied
    let mut tag = t2t_image(48);
    tag.image[15] = 0x0F;
    tag.image[17] = 0x03;
    tag.image[18] = 0xD0;
    let mut ctx = TagContext::new(TagType::Type2, Box::new(tag)).unwrap();
    assert_eq!(ctx.check_ndef().unwrap(), TagState::ReadOnly);
    assert!(matches!(ctx.write_ndef(&[1]), Err(Error::ReadOnlyTag)));
    assert!(matches!(ctx.erase_ndef(), Err(Error::ReadOnlyTag)));
    assert!(ctx.read_ndef().is_ok());

    // Type 3: RWFlag zero
    let tag = t3t_image(4, 2, 6, 3, 0x00);
    let mut ctx = TagContext::new(TagType::Type3, Box::new(tag)).unwrap();
    assert_eq!(ctx.check_ndef().unwrap(), TagState::ReadOnly);

    // Type 5: write access bits denied
    let mut tag = t5t_image(4, 64, 0x00);
    tag.image[1] = 0x43;
    tag.image[5] = 0x01;
    tag.image[6] = 0xD0;
    let mut ctx = TagContext::new(TagType::Type5, Box::new(tag)).unwrap();
    assert_eq!(ctx.check_ndef().unwrap(), TagState::ReadOnly);
}

#[test]
fn read_only_transition_persists_on_the_tag() {
    init_logs();
    let mut ctx = t3t_context(6);
    ctx.check_ndef().unwrap();
    ctx.write_ndef(&text_record()).unwrap();

    ctx.set_config(ConfigKey::ReadOnly, 1).unwrap();
    assert_eq!(ctx.state(), TagState::ReadOnly);
    assert_eq!(ctx.get_config(ConfigKey::ReadOnly).unwrap(), 1);

    // A fresh detection sees the on-tag flag, not cached state
    ctx.reset().unwrap();
    assert_eq!(ctx.get_config(ConfigKey::ReadOnly).unwrap(), 0);
    assert_eq!(ctx.check_ndef().unwrap(), TagState::ReadOnly);
    assert_eq!(ctx.read_ndef().unwrap(), text_record());
}

#[test]
fn read_only_transition_is_one_way() {
    init_logs();
    let mut ctx = t2t_context(48);
    ctx.check_ndef().unwrap();
    assert!(matches!(
        ctx.set_config(ConfigKey::ReadOnly, 0),
        Err(Error::InvalidParameter(_))
    ));
    ctx.set_config(ConfigKey::ReadOnly, 1).unwrap();
    // Idempotent once set
    ctx.set_config(ConfigKey::ReadOnly, 1).unwrap();
    assert!(matches!(
        ctx.set_config(ConfigKey::ReadOnly, 0),
        Err(Error::InvalidParameter(_))
    ));
}

#[test]
fn torn_type3_write_is_flagged() {
    init_logs();
    // WriteFlag raised: the previous writer never completed
    let mut tag = t3t_image(4, 2, 6, 3, 0x01);
    tag.image[9] = 0x0F;
    let sum = u16::from_be_bytes([tag.image[14], tag.image[15]]).wrapping_add(0x0F);
    tag.image[14..16].copy_from_slice(&sum.to_be_bytes());
    let mut ctx = TagContext::new(TagType::Type3, Box::new(tag)).unwrap();
    assert!(matches!(ctx.check_ndef(), Err(Error::MisconfiguredTag(_))));
    assert_eq!(ctx.state(), TagState::None);
}

#[test]
fn lock_block_reaches_type5_only() {
    init_logs();
    let mut ctx = t5t_context(4, 64, 0x08);
    ctx.check_ndef().unwrap();
    ctx.lock_block(6).unwrap();

    let mut ctx = t2t_context(48);
    ctx.check_ndef().unwrap();
    assert!(matches!(ctx.lock_block(6), Err(Error::InvalidParameter(_))));
}

#[test]
fn mifare_detection_classifies_from_gpb() {
    init_logs();
    let mut ctx = mfc_context(&[1]);
    assert_eq!(ctx.check_ndef().unwrap(), TagState::Initialized);

    // Write bits denied in the NDEF sector GPB
    let mut tag = mfc_image(&[1]);
    tag.image[64 + 48 + 9] = 0x43;
    tag.image[64] = 0x03;
    tag.image[65] = 0x03;
    tag.image[66] = 0xD0;
    let mut ctx = TagContext::new(TagType::MifareClassic, Box::new(tag)).unwrap();
    assert_eq!(ctx.check_ndef().unwrap(), TagState::ReadOnly);
}
