//! Contract between the session logic and the reader hardware.

use core::fmt;

use serde::Deserialize;

use crate::keys::SectorKey;
use crate::tag::{Block, Page, TagId};

/// MIFARE authentication key type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum KeyType {
    #[default]
    A,
    B,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::A => f.write_str("A"),
            KeyType::B => f.write_str("B"),
        }
    }
}

/// Blocking access to a reader with at most one selected tag.
///
/// Every call runs one exchange with the tag and returns when it is done.
/// Implementations must not retry on their own, retry policy belongs to the
/// caller.
pub trait Transceiver {
    type Error: fmt::Debug;

    /// Select a tag in the field, `None` when the field is empty.
    fn poll_for_tag(&mut self) -> Result<Option<TagId>, Self::Error>;

    /// `Ok(false)` when the tag rejected the key.
    fn authenticate_block(
        &mut self,
        uid: &TagId,
        block: u8,
        key_type: KeyType,
        key: &SectorKey,
    ) -> Result<bool, Self::Error>;

    fn read_data_block(&mut self, block: u8) -> Result<Block, Self::Error>;

    fn read_sequential_page(&mut self, page: u8) -> Result<Page, Self::Error>;
}

impl<T: Transceiver + ?Sized> Transceiver for &mut T {
    type Error = T::Error;

    fn poll_for_tag(&mut self) -> Result<Option<TagId>, Self::Error> {
        (**self).poll_for_tag()
    }

    fn authenticate_block(
        &mut self,
        uid: &TagId,
        block: u8,
        key_type: KeyType,
        key: &SectorKey,
    ) -> Result<bool, Self::Error> {
        (**self).authenticate_block(uid, block, key_type, key)
    }

    fn read_data_block(&mut self, block: u8) -> Result<Block, Self::Error> {
        (**self).read_data_block(block)
    }

    fn read_sequential_page(&mut self, page: u8) -> Result<Page, Self::Error> {
        (**self).read_sequential_page(page)
    }
}
