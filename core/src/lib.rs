//! Tag classification and content extraction for a contactless reader.
//!
//! A poll cycle asks the [`Transceiver`] for a present ISO14443A tag, classifies
//! it by UID length and routes it:
//!
//! - 4 byte UID -> MIFARE Classic style secured sector: authenticate the target
//!   sector with the [`KeyCatalog`], then read its three data blocks as one
//!   48 byte payload (all or nothing)
//! - 7 byte UID -> NTAG style sequential memory: read pages one by one, a bad
//!   page is reported and the scan continues
//! - anything else -> unclassified notice, no further driver traffic
//!
//! Results go to a [`Reporter`] (log and/or a 16x2 character display).
//!
//! Hardware collaborators live in [`nfc`] (PN532 over I2C, through the `pn532`
//! crate) and [`lcd`] (HD44780 behind a PCF8574 backpack). Both are written
//! against `embedded-hal` 1.0 so the crate stays HAL agnostic.

#![cfg_attr(not(test), no_std)]

pub mod auth;
pub mod bringup;
pub mod config;
pub mod error;
pub mod keys;
pub mod lcd;
pub mod nfc;
pub mod reader;
pub mod report;
pub mod session;
pub mod tag;
pub mod transceiver;

pub use auth::{authenticate_sector, Authenticated};
pub use bringup::{bring_up, BringUpError};
pub use config::SessionConfig;
pub use error::{ConfigError, ExtractError, MemoryUnit};
pub use keys::{KeyCatalog, SectorKey, DEFAULT_KEYS};
pub use nfc::{Pn532Reader, ReaderError};
pub use report::{CharDisplay, DisplayReporter, HexBytes, HexChars, LogReporter, Reporter};
pub use session::{CycleOutcome, SectorPayload, Session};
pub use tag::{Block, Page, Sector, TagFamily, TagId};
pub use transceiver::{KeyType, Transceiver};
