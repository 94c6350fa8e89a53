//! Simulated RF field: a scripted sequence of tags presented to the reader.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use anyhow::Context;
use log::debug;
use serde::Deserialize;
use tagscan_core::{Block, KeyType, Page, SectorKey, TagId, Transceiver};

/// NTAG213 page count
const DEFAULT_PAGE_COUNT: u16 = 45;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// One entry per poll cycle, `null` for an empty field
    pub steps: Vec<Option<TagSpec>>,
}

impl Scenario {
    pub fn demo() -> anyhow::Result<Self> {
        serde_json::from_str(include_str!("../scenarios/demo.json"))
            .context("parsing built-in demo scenario")
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let text =
            std::fs::read_to_string(path).with_context(|| format!("reading scenario {path}"))?;
        serde_json::from_str(&text).with_context(|| format!("parsing scenario {path}"))
    }

    pub fn into_tags(self) -> anyhow::Result<Vec<Option<SimulatedTag>>> {
        self.steps
            .into_iter()
            .map(|step| step.map(SimulatedTag::try_from).transpose())
            .collect()
    }
}

/// Tag as written in a scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct TagSpec {
    /// UID in hex
    pub uid: String,
    /// Key A of every sector; sector tags without one reject all keys
    #[serde(default)]
    pub key: Option<SectorKey>,
    /// Block or page address -> content in hex, unlisted addresses read as zeroes
    #[serde(default)]
    pub memory: BTreeMap<u8, String>,
    /// Pages that exist on a page based tag
    #[serde(default)]
    pub page_count: Option<u16>,
    /// Addresses whose reads fail
    #[serde(default)]
    pub unreadable: BTreeSet<u8>,
}

/// Hex bytes, whitespace between them allowed.
fn parse_hex(text: &str) -> anyhow::Result<Vec<u8>> {
    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&digits).with_context(|| format!("bad hex {text:?}"))
}

#[derive(Debug, Clone)]
pub struct SimulatedTag {
    uid: TagId,
    key: Option<SectorKey>,
    memory: BTreeMap<u8, Vec<u8>>,
    page_count: u16,
    unreadable: BTreeSet<u8>,
}

impl TryFrom<TagSpec> for SimulatedTag {
    type Error = anyhow::Error;

    fn try_from(spec: TagSpec) -> anyhow::Result<Self> {
        let uid = TagId::from_slice(&parse_hex(&spec.uid)?)?;
        let memory = spec
            .memory
            .into_iter()
            .map(|(addr, hex)| -> anyhow::Result<(u8, Vec<u8>)> { Ok((addr, parse_hex(&hex)?)) })
            .collect::<anyhow::Result<BTreeMap<_, _>>>()?;
        Ok(Self {
            uid,
            key: spec.key,
            memory,
            page_count: spec.page_count.unwrap_or(DEFAULT_PAGE_COUNT),
            unreadable: spec.unreadable,
        })
    }
}

impl SimulatedTag {
    fn read<const N: usize>(&self, addr: u8) -> [u8; N] {
        let mut out = [0u8; N];
        if let Some(data) = self.memory.get(&addr) {
            let n = data.len().min(N);
            out[..n].copy_from_slice(&data[..n]);
        }
        out
    }
}

#[derive(Debug)]
pub enum FieldError {
    NoTag,
    NotAuthenticated(u8),
    Unreadable(u8),
}

/// Driver call counters, for the end of run summary
#[derive(Debug, Default, Clone, Copy)]
pub struct CallStats {
    pub polls: usize,
    pub auths: usize,
    pub block_reads: usize,
    pub page_reads: usize,
}

pub struct SimulatedField {
    steps: VecDeque<Option<SimulatedTag>>,
    present: Option<SimulatedTag>,
    authenticated_sector: Option<u8>,
    stats: CallStats,
}

impl SimulatedField {
    pub fn new(steps: Vec<Option<SimulatedTag>>) -> Self {
        Self {
            steps: steps.into(),
            present: None,
            authenticated_sector: None,
            stats: CallStats::default(),
        }
    }

    pub fn stats(&self) -> CallStats {
        self.stats
    }

    fn tag(&self) -> Result<&SimulatedTag, FieldError> {
        self.present.as_ref().ok_or(FieldError::NoTag)
    }
}

impl Transceiver for SimulatedField {
    type Error = FieldError;

    fn poll_for_tag(&mut self) -> Result<Option<TagId>, Self::Error> {
        self.stats.polls += 1;
        self.present = self.steps.pop_front().flatten();
        self.authenticated_sector = None;
        Ok(self.present.as_ref().map(|tag| tag.uid.clone()))
    }

    fn authenticate_block(
        &mut self,
        uid: &TagId,
        block: u8,
        key_type: KeyType,
        key: &SectorKey,
    ) -> Result<bool, Self::Error> {
        self.stats.auths += 1;
        let tag = self.tag()?;
        let accepted = key_type == KeyType::A && tag.uid == *uid && tag.key == Some(*key);
        debug!(
            "Simulated auth of block {block} with {}: {accepted}",
            hex::encode_upper(key.as_bytes())
        );
        self.authenticated_sector = accepted.then_some(block / 4);
        Ok(accepted)
    }

    fn read_data_block(&mut self, block: u8) -> Result<Block, Self::Error> {
        self.stats.block_reads += 1;
        let tag = self.tag()?;
        if self.authenticated_sector != Some(block / 4) {
            return Err(FieldError::NotAuthenticated(block));
        }
        if tag.unreadable.contains(&block) {
            return Err(FieldError::Unreadable(block));
        }
        Ok(tag.read(block))
    }

    fn read_sequential_page(&mut self, page: u8) -> Result<Page, Self::Error> {
        self.stats.page_reads += 1;
        let tag = self.tag()?;
        if u16::from(page) >= tag.page_count || tag.unreadable.contains(&page) {
            return Err(FieldError::Unreadable(page));
        }
        Ok(tag.read(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(json: &str) -> SimulatedTag {
        let spec: TagSpec = serde_json::from_str(json).unwrap();
        SimulatedTag::try_from(spec).unwrap()
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(parse_hex("AA bb 01").unwrap(), vec![0xAA, 0xBB, 0x01]);
        assert!(parse_hex("ABC").is_err());
        assert!(parse_hex("ZZ").is_err());
    }

    #[test]
    fn blocks_need_authentication_of_their_sector() {
        let tag = tag(
            r#"{ "uid": "AABBCCDD", "key": "FFFFFFFFFFFF", "memory": { "4": "00112233" } }"#,
        );
        let uid = tag.uid.clone();
        let mut field = SimulatedField::new(vec![Some(tag)]);

        assert_eq!(field.poll_for_tag().unwrap(), Some(uid.clone()));
        assert!(matches!(
            field.read_data_block(4),
            Err(FieldError::NotAuthenticated(4))
        ));
        assert!(!field
            .authenticate_block(&uid, 4, KeyType::A, &SectorKey::new([0; 6]))
            .unwrap());
        assert!(field
            .authenticate_block(&uid, 4, KeyType::A, &SectorKey::new([0xFF; 6]))
            .unwrap());

        let block = field.read_data_block(4).unwrap();
        assert_eq!(&block[..4], &[0x00, 0x11, 0x22, 0x33]);
        assert!(block[4..].iter().all(|b| *b == 0));
        assert!(field.read_data_block(8).is_err());
    }

    #[test]
    fn pages_past_the_end_fail() {
        let tag = tag(r#"{ "uid": "04112233445566", "page_count": 3, "unreadable": [1] }"#);
        let mut field = SimulatedField::new(vec![Some(tag), None]);

        assert!(field.poll_for_tag().unwrap().is_some());
        assert!(field.read_sequential_page(0).is_ok());
        assert!(field.read_sequential_page(1).is_err());
        assert!(field.read_sequential_page(3).is_err());

        assert_eq!(field.poll_for_tag().unwrap(), None);
        assert!(matches!(
            field.read_sequential_page(0),
            Err(FieldError::NoTag)
        ));
        assert_eq!(field.stats().polls, 2);
    }

    #[test]
    fn demo_scenario_parses() {
        let tags = Scenario::demo().unwrap().into_tags().unwrap();
        assert!(tags.iter().any(|t| t.is_none()));
        assert!(tags.len() >= 5);
    }
}
