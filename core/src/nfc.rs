//! PN532 NFC controller over I2C.
//!
//! Framing, ACK handling and the ready polling come from the `pn532` crate,
//! this module only turns its requests into [`Transceiver`] operations. The
//! first byte of every InDataExchange answer is the PN532 status, `0x00`
//! meaning the tag answered.
//!
//! Wiring on the reference board (ESP32):
//! - GPIO21 -> SDA
//! - GPIO22 -> SCL
//! - 3V3 / GND, module DIP switches set to I2C
//!
//! PN532 User Manual: https://www.nxp.com/docs/en/user-guide/141520.pdf
//! Error Codes List (the first byte): page 67, 7.1 Error Handling

use core::convert::Infallible;
use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, trace, warn};
use pn532::i2c::I2CInterface;
use pn532::requests::{BorrowedRequest, Command, MifareCommand, SAMMode};
use pn532::{CountDown, Interface, Request};

use crate::error::ConfigError;
use crate::keys::SectorKey;
use crate::tag::{Block, Page, TagId, BLOCK_SIZE, PAGE_SIZE};
use crate::transceiver::{KeyType, Transceiver};

/// 7 bit I2C address
pub const PN532_I2C_ADDR: u8 = 0x24;

/// IC byte reported by a PN532
pub const PN532_IC: u8 = 0x32;

/// InDataExchange status of a rejected MIFARE authentication
pub const STATUS_MIFARE_AUTH_ERROR: u8 = 0x14;

/// Response buffer, large enough for a 16 byte read plus frame overhead
const BUF_LEN: usize = 64;

const COMMAND_TIMEOUT_MS: u32 = 200;
const SETUP_TIMEOUT_MS: u32 = 1000;
/// InListPassiveTarget keeps the field on for its activation retries
const LIST_TIMEOUT_MS: u32 = 1000;

/// NbTg Tg SENS_RES(2) SEL_RES NFCIDLength NFCID(up to 10)
const LIST_RESPONSE_LEN: usize = 24;
/// Status + 16 data bytes
const READ_RESPONSE_LEN: usize = 17;
const AUTH_RESPONSE_LEN: usize = 7;

#[derive(Debug, thiserror::Error)]
pub enum ReaderError<E: Debug> {
    #[error("PN532 error: {0:?}")]
    Pn532(pn532::Error<E>),
    #[error("tag exchange failed with status 0x{0:02X}")]
    Status(u8),
    #[error("response too short")]
    ShortResponse,
    #[error("tag reported an invalid UID: {0}")]
    Uid(#[from] ConfigError),
}

impl<E: Debug> From<pn532::Error<E>> for ReaderError<E> {
    fn from(v: pn532::Error<E>) -> Self {
        ReaderError::Pn532(v)
    }
}

/// Millisecond countdown on a blocking delay, one tick per `wait` call.
pub struct DelayTimer<D> {
    delay: D,
    remaining_ms: u32,
}

impl<D> DelayTimer<D> {
    pub fn new(delay: D) -> Self {
        Self {
            delay,
            remaining_ms: 0,
        }
    }
}

impl<D: DelayNs> CountDown for DelayTimer<D> {
    /// milliseconds
    type Time = u32;

    fn start<T: Into<Self::Time>>(&mut self, count: T) {
        self.remaining_ms = count.into();
    }

    fn wait(&mut self) -> nb::Result<(), Infallible> {
        if self.remaining_ms == 0 {
            return Ok(());
        }
        self.delay.delay_ms(1);
        self.remaining_ms -= 1;
        Err(nb::Error::WouldBlock)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub ic: u8,
    pub version: u8,
    pub revision: u8,
    pub support: u8,
}

/// Tag selected by InListPassiveTarget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub uid: TagId,
    pub atqa: [u8; 2],
    pub sak: u8,
}

pub struct Pn532Reader<I, D> {
    pn532: pn532::Pn532<I, DelayTimer<D>, BUF_LEN>,
}

impl<I2C, D> Pn532Reader<I2CInterface<I2C>, D>
where
    I2C: I2c,
    D: DelayNs,
{
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_interface(I2CInterface { i2c }, delay)
    }
}

impl<I, D> Pn532Reader<I, D>
where
    I: Interface,
    D: DelayNs,
{
    pub fn with_interface(interface: I, delay: D) -> Self {
        Self {
            pn532: pn532::Pn532::new(interface, DelayTimer::new(delay)),
        }
    }

    pub fn firmware_version(&mut self) -> Result<FirmwareVersion, ReaderError<I::Error>> {
        let fw = self
            .pn532
            .process(&Request::GET_FIRMWARE_VERSION, 4, COMMAND_TIMEOUT_MS)?;
        trace!("PN532 Firmware Version response: {fw:?}");
        match *fw {
            [ic, version, revision, support, ..] => Ok(FirmwareVersion {
                ic,
                version,
                revision,
                support,
            }),
            _ => Err(ReaderError::ShortResponse),
        }
    }

    /// Normal mode, no SAM, IRQ pin not wired on I2C boards.
    pub fn sam_configuration(&mut self) -> Result<(), ReaderError<I::Error>> {
        self.pn532.process(
            &Request::sam_configuration(SAMMode::Normal, false),
            0,
            SETUP_TIMEOUT_MS,
        )?;
        Ok(())
    }

    /// Bound InListPassiveTarget so an empty field returns instead of blocking.
    pub fn set_passive_activation_retries(
        &mut self,
        retries: u8,
    ) -> Result<(), ReaderError<I::Error>> {
        // CfgItem 0x05: MxRtyATR, MxRtyPSL, MxRtyPassiveActivation
        let request = Request::new(Command::RFConfiguration, [0x05, 0xFF, 0x01, retries]);
        self.pn532.process(&request, 0, COMMAND_TIMEOUT_MS)?;
        Ok(())
    }

    /// Select one ISO14443A tag at 106 kbps.
    pub fn in_list_passive_target(&mut self) -> Result<Option<Target>, ReaderError<I::Error>> {
        let response = match self.pn532.process(
            &Request::INLIST_ONE_ISO_A_TARGET,
            LIST_RESPONSE_LEN,
            LIST_TIMEOUT_MS,
        ) {
            Ok(response) => response,
            Err(pn532::Error::TimeoutResponse) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match response.first().copied() {
            None => return Err(ReaderError::ShortResponse),
            Some(0) => return Ok(None),
            Some(_) => {}
        }
        if response.len() < 6 {
            return Err(ReaderError::ShortResponse);
        }
        let uid_len = response[5] as usize;
        let uid = response
            .get(6..6 + uid_len)
            .ok_or(ReaderError::ShortResponse)?;
        Ok(Some(Target {
            uid: TagId::from_slice(uid)?,
            atqa: [response[2], response[3]],
            sak: response[4],
        }))
    }

    /// Run one InDataExchange and copy the tag's answer, status byte stripped,
    /// into `out`.
    fn tag_exchange<'r>(
        &mut self,
        request: impl Into<BorrowedRequest<'r>>,
        response_len: usize,
        out: &mut [u8],
    ) -> Result<usize, ReaderError<I::Error>> {
        let response = self
            .pn532
            .process(request, response_len, COMMAND_TIMEOUT_MS)?;
        let (status, answer) = response.split_first().ok_or(ReaderError::ShortResponse)?;
        if *status != 0x00 {
            return Err(ReaderError::Status(*status));
        }
        let n = answer.len().min(out.len());
        out[..n].copy_from_slice(&answer[..n]);
        Ok(answer.len())
    }

    /// The card halts after any failed exchange, select it again so the next
    /// command finds it selected.
    fn reselect(&mut self) {
        debug!("Inlisting again to clear error");
        match self.in_list_passive_target() {
            Ok(Some(_)) => {}
            Ok(None) => debug!("Tag left the field"),
            Err(err) => warn!("Reselect failed: {err:?}"),
        }
    }
}

impl<I, D> Transceiver for Pn532Reader<I, D>
where
    I: Interface,
    D: DelayNs,
{
    type Error = ReaderError<I::Error>;

    fn poll_for_tag(&mut self) -> Result<Option<TagId>, Self::Error> {
        Ok(self.in_list_passive_target()?.map(|target| {
            debug!(
                "Selected tag {} ATQA {:02X}{:02X} SAK {:02X}",
                target.uid, target.atqa[0], target.atqa[1], target.sak
            );
            target.uid
        }))
    }

    fn authenticate_block(
        &mut self,
        uid: &TagId,
        block: u8,
        key_type: KeyType,
        key: &SectorKey,
    ) -> Result<bool, Self::Error> {
        // last 4 UID bytes, the cascade level of the card serial
        let uid = uid.as_bytes();
        let serial = &uid[uid.len().saturating_sub(4)..];
        let key = key.as_bytes();
        let auth_command = match key_type {
            KeyType::A => MifareCommand::AuthenticationWithKeyA,
            KeyType::B => MifareCommand::AuthenticationWithKeyB,
        };
        // InDataExchange: target 1, auth command, block, key, card serial
        let mut data = [0u8; 3 + 6 + 4];
        data[..3].copy_from_slice(&[0x01, auth_command as u8, block]);
        data[3..9].copy_from_slice(key);
        data[9..9 + serial.len()].copy_from_slice(serial);
        let request = BorrowedRequest::new(Command::InDataExchange, &data[..9 + serial.len()]);

        match self.tag_exchange(request, AUTH_RESPONSE_LEN, &mut []) {
            Ok(_) => Ok(true),
            Err(err) => {
                self.reselect();
                match err {
                    ReaderError::Status(STATUS_MIFARE_AUTH_ERROR) => {
                        debug!("Authentication of block {block} rejected");
                        Ok(false)
                    }
                    err => Err(err),
                }
            }
        }
    }

    fn read_data_block(&mut self, block: u8) -> Result<Block, Self::Error> {
        let mut out = [0u8; BLOCK_SIZE];
        let n = self.tag_exchange(
            &Request::new(
                Command::InDataExchange,
                [0x01, MifareCommand::Read as u8, block],
            ),
            READ_RESPONSE_LEN,
            &mut out,
        )?;
        if n < BLOCK_SIZE {
            return Err(ReaderError::ShortResponse);
        }
        Ok(out)
    }

    fn read_sequential_page(&mut self, page: u8) -> Result<Page, Self::Error> {
        // READ returns 4 pages, keep the one asked for
        let mut out = [0u8; BLOCK_SIZE];
        let n = self.tag_exchange(&Request::ntag_read(page), READ_RESPONSE_LEN, &mut out)?;
        if n < PAGE_SIZE {
            return Err(ReaderError::ShortResponse);
        }
        let mut page_data = [0u8; PAGE_SIZE];
        page_data.copy_from_slice(&out[..PAGE_SIZE]);
        Ok(page_data)
    }
}
