//! Sector authentication by linear trial over the key catalog.

use log::{debug, info, warn};

use crate::error::ExtractError;
use crate::keys::{KeyCatalog, SectorKey};
use crate::tag::{Sector, TagId};
use crate::transceiver::{KeyType, Transceiver};

/// Key that opened a sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authenticated {
    /// Position in the catalog
    pub key_index: usize,
    pub key: SectorKey,
}

/// Try every catalog key, in order, against the first block of `sector`.
///
/// Stops at the first key the tag accepts. A transport error counts as a
/// rejected trial.
pub fn authenticate_sector<T>(
    driver: &mut T,
    uid: &TagId,
    sector: Sector,
    key_type: KeyType,
    catalog: &KeyCatalog<'_>,
) -> Result<Authenticated, ExtractError>
where
    T: Transceiver + ?Sized,
{
    let block = sector.first_block();
    for (key_index, key) in catalog.iter() {
        match driver.authenticate_block(uid, block, key_type, key) {
            Ok(true) => {
                info!(
                    "Sector {} authenticated with key {key_type} #{key_index}",
                    sector.index()
                );
                return Ok(Authenticated {
                    key_index,
                    key: *key,
                });
            }
            Ok(false) => {
                debug!("Key #{key_index} rejected for block {block}");
            }
            Err(err) => {
                warn!("Error {err:?} during authentication of block {block} with key #{key_index}");
            }
        }
    }
    Err(ExtractError::AllKeysExhausted {
        sector: sector.index(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::{Block, Page};

    struct KeyedTag {
        key: SectorKey,
        attempts: Vec<(u8, SectorKey)>,
        broken_attempts: usize,
    }

    impl Transceiver for KeyedTag {
        type Error = &'static str;

        fn poll_for_tag(&mut self) -> Result<Option<TagId>, Self::Error> {
            Ok(None)
        }

        fn authenticate_block(
            &mut self,
            _uid: &TagId,
            block: u8,
            _key_type: KeyType,
            key: &SectorKey,
        ) -> Result<bool, Self::Error> {
            self.attempts.push((block, *key));
            if self.attempts.len() <= self.broken_attempts {
                return Err("bus");
            }
            Ok(*key == self.key)
        }

        fn read_data_block(&mut self, _block: u8) -> Result<Block, Self::Error> {
            Err("unused")
        }

        fn read_sequential_page(&mut self, _page: u8) -> Result<Page, Self::Error> {
            Err("unused")
        }
    }

    fn uid() -> TagId {
        TagId::from_slice(&[0xAA, 0xBB, 0xCC, 0xDD]).unwrap()
    }

    const KEYS: [SectorKey; 3] = [
        SectorKey::new([0x10; 6]),
        SectorKey::new([0x20; 6]),
        SectorKey::new([0xFF; 6]),
    ];

    #[test]
    fn stops_at_first_accepted_key() {
        let mut tag = KeyedTag {
            key: KEYS[1],
            attempts: Vec::new(),
            broken_attempts: 0,
        };
        let catalog = KeyCatalog::new(&KEYS).unwrap();
        let res =
            authenticate_sector(&mut tag, &uid(), Sector::new(1).unwrap(), KeyType::A, &catalog)
                .unwrap();

        assert_eq!(res.key_index, 1);
        assert_eq!(tag.attempts, vec![(4, KEYS[0]), (4, KEYS[1])]);
    }

    #[test]
    fn last_key_takes_one_attempt_per_key() {
        let mut tag = KeyedTag {
            key: KEYS[2],
            attempts: Vec::new(),
            broken_attempts: 0,
        };
        let catalog = KeyCatalog::new(&KEYS).unwrap();
        let res =
            authenticate_sector(&mut tag, &uid(), Sector::new(1).unwrap(), KeyType::A, &catalog)
                .unwrap();

        assert_eq!(res.key_index, 2);
        assert_eq!(res.key, KEYS[2]);
        assert_eq!(tag.attempts.len(), 3);
    }

    #[test]
    fn exhausted_catalog_fails() {
        let mut tag = KeyedTag {
            key: SectorKey::new([0x42; 6]),
            attempts: Vec::new(),
            broken_attempts: 0,
        };
        let catalog = KeyCatalog::new(&KEYS).unwrap();
        let res =
            authenticate_sector(&mut tag, &uid(), Sector::new(2).unwrap(), KeyType::A, &catalog);

        assert_eq!(res, Err(ExtractError::AllKeysExhausted { sector: 2 }));
        assert_eq!(tag.attempts.len(), 3);
        assert!(tag.attempts.iter().all(|(block, _)| *block == 8));
    }

    #[test]
    fn transport_error_moves_on_to_next_key() {
        let mut tag = KeyedTag {
            key: KEYS[0],
            attempts: Vec::new(),
            broken_attempts: 1,
        };
        let catalog = KeyCatalog::new(&KEYS).unwrap();
        let res =
            authenticate_sector(&mut tag, &uid(), Sector::new(1).unwrap(), KeyType::A, &catalog);

        // the matching key hit the bus error, nothing else matches
        assert_eq!(res, Err(ExtractError::AllKeysExhausted { sector: 1 }));
        assert_eq!(tag.attempts.len(), 3);
    }
}
