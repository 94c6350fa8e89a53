//! Power-on sequence: display first, then the reader.
//!
//! A missing reader is returned as an error. What to do about it (halt, blink,
//! retry) is the caller's decision.

use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{error, info, warn};

use crate::lcd::Hd44780;
use crate::nfc::{FirmwareVersion, Pn532Reader, ReaderError, PN532_IC};
use crate::report::CharDisplay;

/// MxRtyPassiveActivation used after bring-up, roughly 100 ms per empty poll
pub const PASSIVE_ACTIVATION_RETRIES: u8 = 0x10;

#[derive(Debug, thiserror::Error)]
pub enum BringUpError<NE: Debug, DE> {
    #[error("display init failed: {0:?}")]
    Display(DE),
    #[error("PN532 not found: {0}")]
    ReaderNotFound(ReaderError<NE>),
    #[error("unexpected chip 0x{0:02X} answered as PN532")]
    UnsupportedChip(u8),
    #[error("PN532 configuration failed: {0}")]
    ReaderSetup(ReaderError<NE>),
}

pub fn bring_up<NI, ND, DI, DD>(
    lcd: &mut Hd44780<DI, DD>,
    nfc: &mut Pn532Reader<NI, ND>,
) -> Result<FirmwareVersion, BringUpError<NI::Error, DI::Error>>
where
    NI: pn532::Interface,
    ND: DelayNs,
    DI: I2c,
    DD: DelayNs,
{
    lcd.init().map_err(BringUpError::Display)?;
    lcd.set_backlight(true).map_err(BringUpError::Display)?;

    let version = match nfc.firmware_version() {
        Ok(version) => version,
        Err(err) => {
            error!("PN532 not found: {err}");
            show(lcd, "PN532 NOT FOUND");
            return Err(BringUpError::ReaderNotFound(err));
        }
    };
    if version.ic != PN532_IC {
        error!("Unexpected IC 0x{:02X}", version.ic);
        show(lcd, "PN532 NOT FOUND");
        return Err(BringUpError::UnsupportedChip(version.ic));
    }
    info!("Found chip PN5{:02X}", version.ic);
    info!("Firmware ver. {}.{}", version.version, version.revision);

    nfc.sam_configuration().map_err(BringUpError::ReaderSetup)?;
    nfc.set_passive_activation_retries(PASSIVE_ACTIVATION_RETRIES)
        .map_err(BringUpError::ReaderSetup)?;

    show(lcd, "all set up");
    Ok(version)
}

fn show<I, D>(lcd: &mut Hd44780<I, D>, text: &str)
where
    I: I2c,
    D: DelayNs,
{
    if let Err(err) = lcd.write_line(1, text) {
        warn!("Display error {err:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfc::scripted::{NoDelay, ScriptedInterface};
    use core::convert::Infallible;
    use embedded_hal::i2c::{ErrorType, Operation};

    /// LCD backpack that only counts the bytes it is sent.
    #[derive(Default)]
    struct Backpack {
        bytes: usize,
    }

    impl ErrorType for Backpack {
        type Error = Infallible;
    }

    impl I2c for Backpack {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            assert_eq!(address, crate::lcd::LCD_I2C_ADDR);
            for op in operations {
                if let Operation::Write(bytes) = op {
                    self.bytes += bytes.len();
                }
            }
            Ok(())
        }
    }

    fn devices() -> (
        ScriptedInterface,
        Hd44780<Backpack, NoDelay>,
        Pn532Reader<ScriptedInterface, NoDelay>,
    ) {
        let bus = ScriptedInterface::default();
        let lcd = Hd44780::new(Backpack::default(), NoDelay);
        let nfc = Pn532Reader::with_interface(bus.clone(), NoDelay);
        (bus, lcd, nfc)
    }

    #[test]
    fn missing_reader_returns_error() {
        let (_bus, mut lcd, mut nfc) = devices();

        let res = bring_up(&mut lcd, &mut nfc);
        assert!(matches!(
            res,
            Err(BringUpError::ReaderNotFound(ReaderError::Pn532(_)))
        ));
        assert!(lcd.release().0.bytes > 0);
    }

    #[test]
    fn wrong_chip_is_rejected() {
        let (bus, mut lcd, mut nfc) = devices();
        bus.0.borrow_mut().respond(&[0x03, 0x31, 0x01, 0x06, 0x07]);

        assert!(matches!(
            bring_up(&mut lcd, &mut nfc),
            Err(BringUpError::UnsupportedChip(0x31))
        ));
    }

    #[test]
    fn configures_reader_after_version_check() {
        let (bus, mut lcd, mut nfc) = devices();
        {
            let mut script = bus.0.borrow_mut();
            script.respond(&[0x03, 0x32, 0x01, 0x06, 0x07]);
            script.respond(&[0x15]);
            script.respond(&[0x33]);
        }

        let version = bring_up(&mut lcd, &mut nfc).unwrap();
        assert_eq!((version.version, version.revision), (1, 6));

        let script = bus.0.borrow();
        let codes: Vec<u8> = (0..script.written.len())
            .map(|n| script.command(n)[1])
            .collect();
        assert_eq!(codes, vec![0x02, 0x14, 0x32]);
        assert_eq!(&script.command(2)[2..], &[0x05, 0xFF, 0x01, PASSIVE_ACTIVATION_RETRIES]);
        assert!(script.reads.is_empty());
    }
}
