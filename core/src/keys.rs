//! Candidate keys for sector authentication.

use core::fmt;
use core::str::FromStr;

use serde::Deserialize;
use serde_with::{hex::Hex, serde_as};

use crate::error::ConfigError;

pub const KEY_LEN: usize = 6;

/// 6 byte MIFARE Crypto-1 key. Deserializes from 12 hex digits.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(transparent)]
pub struct SectorKey(#[serde_as(as = "Hex")] pub [u8; KEY_LEN]);

impl SectorKey {
    pub const fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Display for SectorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

/// Parses 12 hex digits; spaces, `:` and `-` between bytes are ignored.
impl FromStr for SectorKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut digits = heapless::Vec::<u8, { KEY_LEN * 2 }>::new();
        for c in s.bytes().filter(|c| !matches!(c, b' ' | b':' | b'-')) {
            digits.push(c).map_err(|_| ConfigError::MalformedKey)?;
        }
        let mut key = [0u8; KEY_LEN];
        hex::decode_to_slice(&digits[..], &mut key).map_err(|_| ConfigError::MalformedKey)?;
        Ok(SectorKey(key))
    }
}

/// Well known transport and vendor default keys, factory default first.
pub const DEFAULT_KEYS: [SectorKey; 8] = [
    SectorKey::new([0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]),
    SectorKey::new([0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5]),
    SectorKey::new([0xD3, 0xF7, 0xD3, 0xF7, 0xD3, 0xF7]),
    SectorKey::new([0x00, 0x00, 0x00, 0x00, 0x00, 0x00]),
    SectorKey::new([0xB0, 0xB1, 0xB2, 0xB3, 0xB4, 0xB5]),
    SectorKey::new([0x4D, 0x3A, 0x99, 0xC3, 0x51, 0xDD]),
    SectorKey::new([0x1A, 0x98, 0x2C, 0x7E, 0x45, 0x9A]),
    SectorKey::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]),
];

/// Ordered, read-only list of keys. Trial order is catalog order.
#[derive(Clone, Copy, Debug)]
pub struct KeyCatalog<'a> {
    keys: &'a [SectorKey],
}

impl<'a> KeyCatalog<'a> {
    pub fn new(keys: &'a [SectorKey]) -> Result<Self, ConfigError> {
        if keys.is_empty() {
            return Err(ConfigError::EmptyKeyCatalog);
        }
        Ok(Self { keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a SectorKey> {
        self.keys.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a SectorKey)> {
        self.keys.iter().enumerate()
    }
}

impl Default for KeyCatalog<'static> {
    fn default() -> Self {
        Self { keys: &DEFAULT_KEYS }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_catalog_is_rejected() {
        assert_eq!(
            KeyCatalog::new(&[]).unwrap_err(),
            ConfigError::EmptyKeyCatalog
        );
    }

    #[test]
    fn catalog_keeps_order() {
        let keys = [
            SectorKey::new([1; 6]),
            SectorKey::new([2; 6]),
            SectorKey::new([3; 6]),
        ];
        let catalog = KeyCatalog::new(&keys).unwrap();
        let order: Vec<_> = catalog.iter().map(|(i, k)| (i, k.0[0])).collect();
        assert_eq!(order, vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn default_catalog_starts_with_factory_key() {
        let catalog = KeyCatalog::default();
        assert_eq!(catalog.len(), DEFAULT_KEYS.len());
        assert_eq!(catalog.get(0).unwrap().0, [0xFF; 6]);
    }

    #[test]
    fn key_parses_from_hex() {
        let key: SectorKey = "a0a1a2a3a4a5".parse().unwrap();
        assert_eq!(key.0, [0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5]);
        let key: SectorKey = "FF:FF:FF:FF:FF:FF".parse().unwrap();
        assert_eq!(key.0, [0xFF; 6]);
        assert_eq!(key.to_string(), "FFFFFFFFFFFF");

        assert!("FFFFFFFFFF".parse::<SectorKey>().is_err());
        assert!("FFFFFFFFFFFF00".parse::<SectorKey>().is_err());
        assert!("GGFFFFFFFFFF".parse::<SectorKey>().is_err());
    }

    #[test]
    fn key_deserializes_from_json_string() {
        let keys: Vec<SectorKey> =
            serde_json::from_str(r#"["FFFFFFFFFFFF", "d3f7d3f7d3f7"]"#).unwrap();
        assert_eq!(keys[1].0, [0xD3, 0xF7, 0xD3, 0xF7, 0xD3, 0xF7]);
        assert!(serde_json::from_str::<SectorKey>(r#""nope""#).is_err());
        assert!(serde_json::from_str::<SectorKey>(r#""FFFFFFFF""#).is_err());
    }
}
