// Full tag lifecycle against an in-memory Type 2 image: format, detect,
// write, read back, erase, and finally lock. Run with
// `RUST_LOG=debug cargo run --example memory_walkthrough` to watch the
// block traffic.

use ndeftag::prelude::*;
use ndeftag::transport::mock::MemoryTag;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // A blank 144-byte tag: 16 bytes of header, 128 bytes of data area
    let tag = MemoryTag::new(144, 4);
    let mut ctx = TagContext::new(TagType::Type2, Box::new(tag))?;
    ctx.set_config(ConfigKey::MemorySize, 128)?;

    println!("Formatting blank tag...");
    ctx.format_ndef()?;
    println!("Detection: {}", ctx.check_ndef()?);
    println!(
        "Capacity: {} bytes, current message: {} bytes",
        ctx.max_ndef_len(),
        ctx.ndef_len()
    );

    // A "T" record, `en` language, text `hello`
    let message = [
        0xD1, 0x01, 0x08, 0x54, 0x02, b'e', b'n', b'h', b'e', b'l', b'l', b'o',
    ];
    println!("\nWriting {} byte message...", message.len());
    ctx.write_ndef(&message)?;
    println!("State: {}", ctx.state());

    let read_back = ctx.read_ndef()?;
    println!("Read back: {}", bytes_to_hex_spaced(&read_back));

    println!("\nErasing...");
    ctx.erase_ndef()?;
    println!("State: {}", ctx.state());
    match ctx.read_ndef() {
        Err(Error::EmptyNdef) => println!("No message, as expected"),
        other => println!("Unexpected: {:?}", other),
    }

    println!("\nWriting again and locking the tag...");
    ctx.write_ndef(&message)?;
    ctx.set_config(ConfigKey::ReadOnly, 1)?;
    println!("State: {}", ctx.state());
    match ctx.write_ndef(&message) {
        Err(Error::ReadOnlyTag) => println!("Writes refused, as expected"),
        other => println!("Unexpected: {:?}", other),
    }

    Ok(())
}
