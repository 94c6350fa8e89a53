//! Simulator configuration, read from the JSON file named by `TAGSCAN_CONFIG`.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tagscan_core::{SectorKey, SessionConfig, DEFAULT_KEYS};

pub const CONFIG_ENV: &str = "TAGSCAN_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    /// Key catalog in trial order, 12 hex digits each
    pub keys: Vec<SectorKey>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            keys: DEFAULT_KEYS.to_vec(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::load(path),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        config.session.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = Config::parse("{}").unwrap();
        assert_eq!(config.keys, DEFAULT_KEYS.to_vec());
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn custom_keys_and_sector() {
        let config = Config::parse(
            r#"{ "session": { "target_sector": 4 }, "keys": ["A0A1A2A3A4A5"] }"#,
        )
        .unwrap();
        assert_eq!(config.session.target_sector, 4);
        assert_eq!(config.keys, vec![SectorKey::new([0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5])]);
    }

    #[test]
    fn invalid_session_is_rejected() {
        assert!(Config::parse(r#"{ "session": { "page_count": 0 } }"#).is_err());
        assert!(Config::parse(r#"{ "keys": ["XYZ"] }"#).is_err());
    }
}
