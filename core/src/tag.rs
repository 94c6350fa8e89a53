//! Tag identifiers and memory layout.

use core::fmt;

use crate::error::ConfigError;

/// Bytes per MIFARE Classic block
pub const BLOCK_SIZE: usize = 16;
/// Bytes per NTAG page
pub const PAGE_SIZE: usize = 4;
/// Blocks per sector for the 1K layout (and the first 32 sectors of 4K)
pub const BLOCKS_PER_SECTOR: u8 = 4;
/// Data blocks read from a sector; the last block is the sector trailer
pub const DATA_BLOCKS_PER_SECTOR: u8 = 3;
/// Highest sector index with a 4-block layout
pub const MAX_SECTOR: u8 = 31;
/// ISO14443A triple size UID
pub const MAX_UID_LEN: usize = 10;

pub type Block = [u8; BLOCK_SIZE];
pub type Page = [u8; PAGE_SIZE];

/// UID of a tag in the field (4, 7 or 10 bytes on real tags).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TagId {
    bytes: heapless::Vec<u8, MAX_UID_LEN>,
}

impl TagId {
    pub fn from_slice(uid: &[u8]) -> Result<Self, ConfigError> {
        let bytes =
            heapless::Vec::from_slice(uid).map_err(|_| ConfigError::UidTooLong(uid.len()))?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Card family, decided by UID length only.
    ///
    /// ATQA/SAK are not consulted, so Ultralight variants with 7 byte UIDs land
    /// in [`TagFamily::SequentialPage`] together with NTAG.
    pub fn family(&self) -> TagFamily {
        match self.bytes.len() {
            4 => TagFamily::SecuredSector,
            7 => TagFamily::SequentialPage,
            len => TagFamily::Unclassified(len),
        }
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.bytes.iter() {
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFamily {
    /// MIFARE Classic style, sector based with key authentication
    SecuredSector,
    /// NTAG2xx / Ultralight style, plain 4 byte pages
    SequentialPage,
    /// Any other UID length
    Unclassified(usize),
}

impl fmt::Display for TagFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagFamily::SecuredSector => f.write_str("MIFARE Classic (4 byte UID)"),
            TagFamily::SequentialPage => f.write_str("NTAG2xx (7 byte UID)"),
            TagFamily::Unclassified(len) => write!(f, "unclassified ({len} byte UID)"),
        }
    }
}

/// Sector index of a sector based tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sector(u8);

impl Sector {
    pub fn new(index: u8) -> Result<Self, ConfigError> {
        if index > MAX_SECTOR {
            return Err(ConfigError::SectorOutOfRange(index));
        }
        Ok(Self(index))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn first_block(self) -> u8 {
        self.0 * BLOCKS_PER_SECTOR
    }

    /// Absolute addresses of the data blocks, trailer excluded.
    pub fn data_blocks(self) -> impl Iterator<Item = u8> {
        let first = self.first_block();
        (0..DATA_BLOCKS_PER_SECTOR).map(move |offset| first + offset)
    }
}
