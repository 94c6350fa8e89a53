//! Session settings. Defaults reproduce the stock reader behavior.

use serde::Deserialize;

use crate::error::ConfigError;
use crate::tag::Sector;
use crate::transceiver::KeyType;

pub const DEFAULT_TARGET_SECTOR: u8 = 1;
/// NTAG203 page count, also covers the user area start of larger NTAG2xx
pub const DEFAULT_PAGE_COUNT: u8 = 42;
pub const DEFAULT_POLL_INTERVAL_MS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sector read from 4 byte UID tags. Sector 0 holds manufacturer data.
    pub target_sector: u8,
    pub key_type: KeyType,
    /// Pages scanned on 7 byte UID tags, starting at page 0
    pub page_count: u8,
    /// Pause between poll cycles in [`crate::Session::run`]
    pub poll_interval_ms: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_sector: DEFAULT_TARGET_SECTOR,
            key_type: KeyType::A,
            page_count: DEFAULT_PAGE_COUNT,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sector()?;
        if self.page_count == 0 {
            return Err(ConfigError::NoPages);
        }
        Ok(())
    }

    pub fn sector(&self) -> Result<Sector, ConfigError> {
        Sector::new(self.target_sector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.target_sector, 1);
        assert_eq!(config.key_type, KeyType::A);
        assert_eq!(config.page_count, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{ "target_sector": 3, "key_type": "B" }"#).unwrap();
        assert_eq!(config.target_sector, 3);
        assert_eq!(config.key_type, KeyType::B);
        assert_eq!(config.page_count, DEFAULT_PAGE_COUNT);
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }

    #[test]
    fn validation() {
        let config = SessionConfig {
            target_sector: 32,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::SectorOutOfRange(32)));

        let config = SessionConfig {
            page_count: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoPages));
    }
}
