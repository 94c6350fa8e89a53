//! Poll, classify, extract, report.
//!
//! A [`Session`] owns the reader and the reporting sink for its whole life.
//! Each call to [`Session::poll_once`] is one complete cycle; nothing carries
//! over from one cycle to the next.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::auth::authenticate_sector;
use crate::config::SessionConfig;
use crate::error::{ConfigError, ExtractError};
use crate::keys::KeyCatalog;
use crate::reader::{read_block, read_page};
use crate::report::Reporter;
use crate::tag::{Sector, TagFamily, TagId, BLOCK_SIZE, DATA_BLOCKS_PER_SECTOR};
use crate::transceiver::{KeyType, Transceiver};

pub const SECTOR_PAYLOAD_LEN: usize = BLOCK_SIZE * DATA_BLOCKS_PER_SECTOR as usize;

/// Data blocks of one sector, concatenated in block order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorPayload {
    pub uid: TagId,
    pub sector: u8,
    pub first_block: u8,
    pub key_type: KeyType,
    pub key_index: usize,
    pub data: [u8; SECTOR_PAYLOAD_LEN],
}

impl SectorPayload {
    pub fn last_block(&self) -> u8 {
        self.first_block + DATA_BLOCKS_PER_SECTOR - 1
    }

    /// `(block address, 16 bytes)` pairs
    pub fn blocks(&self) -> impl Iterator<Item = (u8, &[u8])> {
        (self.first_block..).zip(self.data.chunks_exact(BLOCK_SIZE))
    }
}

/// Summary of one poll cycle. The detailed results went to the reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    NoTag,
    SectorRead { sector: u8, key_index: usize },
    SectorFailed(ExtractError),
    PagesScanned { read: u8, failed: u8 },
    Unclassified { uid_len: usize },
}

pub struct Session<'k, T, R> {
    driver: T,
    reporter: R,
    catalog: KeyCatalog<'k>,
    sector: Sector,
    config: SessionConfig,
}

impl<'k, T, R> Session<'k, T, R>
where
    T: Transceiver,
    R: Reporter,
{
    pub fn new(
        driver: T,
        reporter: R,
        catalog: KeyCatalog<'k>,
        config: SessionConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let sector = config.sector()?;
        Ok(Self {
            driver,
            reporter,
            catalog,
            sector,
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn driver(&self) -> &T {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut T {
        &mut self.driver
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn into_parts(self) -> (T, R) {
        (self.driver, self.reporter)
    }

    /// Poll forever, pausing `poll_interval_ms` between cycles.
    pub fn run<D: DelayNs>(&mut self, delay: &mut D) -> ! {
        info!("Waiting for an ISO14443A card ...");
        loop {
            self.poll_once();
            delay.delay_ms(self.config.poll_interval_ms);
        }
    }

    pub fn poll_once(&mut self) -> CycleOutcome {
        let uid = match self.driver.poll_for_tag() {
            Ok(Some(uid)) => uid,
            Ok(None) => return CycleOutcome::NoTag,
            Err(err) => {
                warn!("Error {err:?} while polling for a tag");
                return CycleOutcome::NoTag;
            }
        };

        let family = uid.family();
        self.reporter.tag_detected(&uid, family);

        match family {
            TagFamily::SecuredSector => match self.read_secured_sector(&uid) {
                Ok(payload) => {
                    self.reporter.sector_read(&payload);
                    CycleOutcome::SectorRead {
                        sector: payload.sector,
                        key_index: payload.key_index,
                    }
                }
                Err(err) => {
                    self.reporter.sector_failed(&uid, &err);
                    CycleOutcome::SectorFailed(err)
                }
            },
            TagFamily::SequentialPage => {
                let (read, failed) = self.scan_pages();
                info!("Scanned {} pages, {failed} unreadable", read + failed);
                CycleOutcome::PagesScanned { read, failed }
            }
            TagFamily::Unclassified(uid_len) => {
                self.reporter.unclassified(&uid);
                CycleOutcome::Unclassified { uid_len }
            }
        }
    }

    /// Authenticate the target sector and read its data blocks.
    ///
    /// All or nothing: one unreadable block fails the whole sector.
    pub fn read_secured_sector(&mut self, uid: &TagId) -> Result<SectorPayload, ExtractError> {
        let auth = authenticate_sector(
            &mut self.driver,
            uid,
            self.sector,
            self.config.key_type,
            &self.catalog,
        )?;

        let mut data = [0u8; SECTOR_PAYLOAD_LEN];
        for (chunk, block) in data
            .chunks_exact_mut(BLOCK_SIZE)
            .zip(self.sector.data_blocks())
        {
            chunk.copy_from_slice(&read_block(&mut self.driver, block)?);
        }

        Ok(SectorPayload {
            uid: uid.clone(),
            sector: self.sector.index(),
            first_block: self.sector.first_block(),
            key_type: self.config.key_type,
            key_index: auth.key_index,
            data,
        })
    }

    /// Read every page and report it. Returns `(read, failed)`.
    fn scan_pages(&mut self) -> (u8, u8) {
        let mut read = 0;
        let mut failed = 0;
        for page in 0..self.config.page_count {
            match read_page(&mut self.driver, page) {
                Ok(data) => {
                    read += 1;
                    self.reporter.page_read(page, Ok(&data));
                }
                Err(err) => {
                    debug!("Page {page} unreadable, continuing");
                    failed += 1;
                    self.reporter.page_read(page, Err(&err));
                }
            }
        }
        (read, failed)
    }
}
