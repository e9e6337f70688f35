// ndeftag/src/tag/mod.rs
//! Tag-operation dispatch. [`TagContext`] owns the transport, the
//! tunables and the detection state machine, and routes the five data
//! operations to the per-type codec selected at construction. State
//! checks live here so every codec only sees calls that are legal for
//! the tag's current state.

pub(crate) mod area;

#[cfg(feature = "mfc")]
pub mod mfc;
#[cfg(feature = "type1")]
pub mod t1t;
#[cfg(feature = "type2")]
pub mod t2t;
#[cfg(feature = "type3")]
pub mod t3t;
#[cfg(feature = "type4")]
pub mod t4t;
#[cfg(feature = "type5")]
pub mod t5t;

use log::{debug, info};

use crate::config::{ConfigKey, TagConfig};
use crate::constants::MAX_NDEF_LEN;
use crate::transport::TagTransport;
use crate::types::{TagState, TagType};
use crate::{Error, Result};

/// What a successful NDEF detection established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    /// Resulting state: initialized, read/write or read-only
    pub state: TagState,
    /// Raw version byte the tag advertised
    pub version: u8,
    /// Current message length in bytes
    pub ndef_len: usize,
    /// Largest message the tag can hold
    pub max_ndef_len: usize,
}

/// The per-type protocol engines. A closed set: adding a tag platform
/// means adding a variant, and every dispatch site is checked at compile
/// time.
#[derive(Debug)]
enum Codec {
    #[cfg(feature = "type1")]
    Type1(t1t::Type1Session),
    #[cfg(feature = "type2")]
    Type2(t2t::Type2Session),
    #[cfg(feature = "type3")]
    Type3(t3t::Type3Session),
    #[cfg(feature = "type4")]
    Type4(t4t::Type4Session),
    #[cfg(feature = "type5")]
    Type5(t5t::Type5Session),
    #[cfg(feature = "mfc")]
    Mifare(mfc::MifareSession),
}

impl Codec {
    fn new(tag_type: TagType) -> Result<Self> {
        Ok(match tag_type {
            #[cfg(feature = "type1")]
            TagType::Type1 => Self::Type1(t1t::Type1Session::default()),
            #[cfg(feature = "type2")]
            TagType::Type2 => Self::Type2(t2t::Type2Session::default()),
            #[cfg(feature = "type3")]
            TagType::Type3 => Self::Type3(t3t::Type3Session::default()),
            #[cfg(feature = "type4")]
            TagType::Type4 => Self::Type4(t4t::Type4Session::default()),
            #[cfg(feature = "type5")]
            TagType::Type5 => Self::Type5(t5t::Type5Session::default()),
            #[cfg(feature = "mfc")]
            TagType::MifareClassic => Self::Mifare(mfc::MifareSession::default()),
            #[allow(unreachable_patterns)]
            other => {
                return Err(Error::InvalidParameter(format!(
                    "{} support is not compiled in",
                    other
                )))
            }
        })
    }
}

/// Fan a method call out to whichever codec is active.
macro_rules! dispatch {
    ($ctx:expr, $session:ident => $call:expr) => {
        match &mut $ctx.codec {
            #[cfg(feature = "type1")]
            Codec::Type1($session) => $call,
            #[cfg(feature = "type2")]
            Codec::Type2($session) => $call,
            #[cfg(feature = "type3")]
            Codec::Type3($session) => $call,
            #[cfg(feature = "type4")]
            Codec::Type4($session) => $call,
            #[cfg(feature = "type5")]
            Codec::Type5($session) => $call,
            #[cfg(feature = "mfc")]
            Codec::Mifare($session) => $call,
        }
    };
}

/// One activated tag: transport, tunables, detection state and the
/// per-type codec.
pub struct TagContext {
    transport: Box<dyn TagTransport>,
    tag_type: TagType,
    config: TagConfig,
    codec: Codec,
    state: TagState,
    version: u8,
    ndef_len: usize,
    max_ndef_len: usize,
}

impl std::fmt::Debug for TagContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagContext")
            .field("tag_type", &self.tag_type)
            .field("state", &self.state)
            .field("ndef_len", &self.ndef_len)
            .field("max_ndef_len", &self.max_ndef_len)
            .finish_non_exhaustive()
    }
}

impl TagContext {
    /// Bind a transport to a tag type with default tunables.
    pub fn new(tag_type: TagType, transport: Box<dyn TagTransport>) -> Result<Self> {
        Self::with_config(tag_type, transport, TagConfig::default())
    }

    /// Bind a transport to a tag type with explicit tunables.
    pub fn with_config(
        tag_type: TagType,
        transport: Box<dyn TagTransport>,
        config: TagConfig,
    ) -> Result<Self> {
        Ok(Self {
            transport,
            tag_type,
            config,
            codec: Codec::new(tag_type)?,
            state: TagState::None,
            version: 0,
            ndef_len: 0,
            max_ndef_len: 0,
        })
    }

    /// Tag platform this context drives.
    pub fn tag_type(&self) -> TagType {
        self.tag_type
    }

    /// Current detection state.
    pub fn state(&self) -> TagState {
        self.state
    }

    /// Version byte from the last successful detection.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Message length from the last successful detection or write.
    pub fn ndef_len(&self) -> usize {
        self.ndef_len
    }

    /// Capacity from the last successful detection.
    pub fn max_ndef_len(&self) -> usize {
        self.max_ndef_len
    }

    fn require_detected(&self) -> Result<()> {
        if self.state.is_detected() {
            Ok(())
        } else {
            Err(Error::InvalidState)
        }
    }

    fn require_writable(&self) -> Result<()> {
        self.require_detected()?;
        if self.state == TagState::ReadOnly {
            return Err(Error::ReadOnlyTag);
        }
        Ok(())
    }

    /// Detect the NDEF message: validate the capability structure, locate
    /// the message and classify the tag. Any failure resets the context
    /// to the undetected state.
    pub fn check_ndef(&mut self) -> Result<TagState> {
        self.forget();
        let detection = dispatch!(self, s => s.check(self.transport.as_mut(), &mut self.config))?;
        let max_ndef_len = detection.max_ndef_len.min(MAX_NDEF_LEN);
        // A tag may claim any length its area can hold; the transfer
        // ceiling still applies before any read loop runs.
        if detection.ndef_len > max_ndef_len {
            return Err(Error::BufferOverflow {
                needed: detection.ndef_len,
                capacity: max_ndef_len,
            });
        }
        self.state = detection.state;
        self.version = detection.version;
        self.ndef_len = detection.ndef_len;
        self.max_ndef_len = max_ndef_len;
        info!(
            "{} detected: {}, {} of {} bytes",
            self.tag_type, self.state, self.ndef_len, self.max_ndef_len
        );
        Ok(self.state)
    }

    /// Read the whole NDEF message.
    pub fn read_ndef(&mut self) -> Result<Vec<u8>> {
        self.require_detected()?;
        if self.ndef_len == 0 {
            return Err(Error::EmptyNdef);
        }
        let data = dispatch!(self, s => s.read(self.transport.as_mut(), &self.config))?;
        debug!("read {} byte message", data.len());
        Ok(data)
    }

    /// Replace the NDEF message.
    pub fn write_ndef(&mut self, data: &[u8]) -> Result<()> {
        self.require_writable()?;
        if data.is_empty() {
            return Err(Error::InvalidParameter(
                "an ndef message cannot be empty; use erase_ndef".to_string(),
            ));
        }
        if data.len() > self.max_ndef_len {
            return Err(Error::BufferOverflow {
                needed: data.len(),
                capacity: self.max_ndef_len,
            });
        }
        dispatch!(self, s => s.write(self.transport.as_mut(), &self.config, data))?;
        self.state = TagState::ReadWrite;
        self.ndef_len = data.len();
        Ok(())
    }

    /// Zero the message length, returning the tag to the initialized
    /// state. The message bytes themselves stay on the tag.
    pub fn erase_ndef(&mut self) -> Result<()> {
        self.require_writable()?;
        dispatch!(self, s => s.erase(self.transport.as_mut(), &self.config))?;
        self.state = TagState::Initialized;
        self.ndef_len = 0;
        Ok(())
    }

    /// Provision a blank tag with the NDEF structure and an empty
    /// message. Refused once a detection has succeeded: the tag is
    /// already formatted. Run [`Self::check_ndef`] afterwards to use the
    /// fresh structure.
    pub fn format_ndef(&mut self) -> Result<()> {
        if self.state.is_detected() {
            return Err(Error::FormattedTag);
        }
        dispatch!(self, s => s.format(self.transport.as_mut(), &self.config))?;
        info!("{} formatted", self.tag_type);
        Ok(())
    }

    /// Permanently lock one block (Type 5 Tag only).
    pub fn lock_block(&mut self, block: u32) -> Result<()> {
        self.require_detected()?;
        match &mut self.codec {
            #[cfg(feature = "type5")]
            Codec::Type5(s) => s.lock_block(self.transport.as_mut(), &self.config, block),
            #[allow(unreachable_patterns)]
            _ => Err(Error::InvalidParameter(format!(
                "lock block is a {} operation",
                TagType::Type5
            ))),
        }
    }

    /// Store a tunable. [`ConfigKey::ReadOnly`] is the write-once
    /// transition: a non-zero value locks the tag against further writes,
    /// on the tag itself where the platform supports it.
    pub fn set_config(&mut self, key: ConfigKey, value: u32) -> Result<()> {
        if key != ConfigKey::ReadOnly {
            return self.config.set(key, value);
        }
        if value == 0 {
            return Err(Error::InvalidParameter(
                "the read-only transition cannot be undone".to_string(),
            ));
        }
        self.require_detected()?;
        if self.state == TagState::ReadOnly {
            return Ok(());
        }
        dispatch!(self, s => s.set_read_only(self.transport.as_mut(), &self.config))?;
        self.state = TagState::ReadOnly;
        info!("{} transitioned to read-only", self.tag_type);
        Ok(())
    }

    /// Fetch a tunable. [`ConfigKey::ReadOnly`] reports whether the tag
    /// is in the read-only state.
    pub fn get_config(&self, key: ConfigKey) -> Result<u32> {
        if key == ConfigKey::ReadOnly {
            return Ok(u32::from(self.state == TagState::ReadOnly));
        }
        self.config.get(key)
    }

    /// Drop all detection state, keeping transport and tunables. The
    /// next operation must be a fresh [`Self::check_ndef`].
    pub fn reset(&mut self) -> Result<()> {
        self.forget();
        self.codec = Codec::new(self.tag_type)?;
        Ok(())
    }

    fn forget(&mut self) {
        self.state = TagState::None;
        self.version = 0;
        self.ndef_len = 0;
        self.max_ndef_len = 0;
    }
}
