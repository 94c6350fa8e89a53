use core::fmt;

/// Addressable memory unit of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryUnit {
    /// 16 byte block of a sector based tag
    Block,
    /// 4 byte page of a sequential memory tag
    Page,
}

impl fmt::Display for MemoryUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryUnit::Block => f.write_str("block"),
            MemoryUnit::Page => f.write_str("page"),
        }
    }
}

/// Failure of one extraction step.
///
/// Both variants end the current step only; the session goes back to polling
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("{unit} {address} could not be read")]
    AddressUnreadable { unit: MemoryUnit, address: u8 },
    #[error("no catalogued key authenticated sector {sector}")]
    AllKeysExhausted { sector: u8 },
}

impl ExtractError {
    pub fn unreadable_block(address: u8) -> Self {
        ExtractError::AddressUnreadable {
            unit: MemoryUnit::Block,
            address,
        }
    }

    pub fn unreadable_page(address: u8) -> Self {
        ExtractError::AddressUnreadable {
            unit: MemoryUnit::Page,
            address,
        }
    }
}

/// Invalid settings or inputs rejected before any tag traffic happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("key catalog must hold at least one key")]
    EmptyKeyCatalog,
    #[error("sector {0} is outside the 4-block sector range 0..=31")]
    SectorOutOfRange(u8),
    #[error("page count must be at least 1")]
    NoPages,
    #[error("UID of {0} bytes exceeds the 10 byte ISO14443A maximum")]
    UidTooLong(usize),
    #[error("key must be 12 hex digits")]
    MalformedKey,
}
