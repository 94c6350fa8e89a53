//! Reporting sinks: log output and the character display.
//!
//! Reporting is observational. Nothing a sink does feeds back into the session,
//! display errors are logged and dropped.

use core::fmt::{self, Write as _};

use log::{info, warn};

use crate::error::{ExtractError, MemoryUnit};
use crate::session::SectorPayload;
use crate::tag::{Page, TagFamily, TagId};

/// Receives the results of each poll cycle.
pub trait Reporter {
    fn tag_detected(&mut self, uid: &TagId, family: TagFamily);

    /// All data blocks of the target sector, in block order.
    fn sector_read(&mut self, payload: &SectorPayload);

    /// Secured path failed: no key matched, or a block could not be read.
    fn sector_failed(&mut self, uid: &TagId, error: &ExtractError);

    /// One entry per scanned page, failures included.
    fn page_read(&mut self, page: u8, result: Result<&Page, &ExtractError>);

    fn unclassified(&mut self, uid: &TagId);
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn tag_detected(&mut self, uid: &TagId, family: TagFamily) {
        (**self).tag_detected(uid, family)
    }

    fn sector_read(&mut self, payload: &SectorPayload) {
        (**self).sector_read(payload)
    }

    fn sector_failed(&mut self, uid: &TagId, error: &ExtractError) {
        (**self).sector_failed(uid, error)
    }

    fn page_read(&mut self, page: u8, result: Result<&Page, &ExtractError>) {
        (**self).page_read(page, result)
    }

    fn unclassified(&mut self, uid: &TagId) {
        (**self).unclassified(uid)
    }
}

/// Fan out to two sinks, first one first.
impl<A: Reporter, B: Reporter> Reporter for (A, B) {
    fn tag_detected(&mut self, uid: &TagId, family: TagFamily) {
        self.0.tag_detected(uid, family);
        self.1.tag_detected(uid, family);
    }

    fn sector_read(&mut self, payload: &SectorPayload) {
        self.0.sector_read(payload);
        self.1.sector_read(payload);
    }

    fn sector_failed(&mut self, uid: &TagId, error: &ExtractError) {
        self.0.sector_failed(uid, error);
        self.1.sector_failed(uid, error);
    }

    fn page_read(&mut self, page: u8, result: Result<&Page, &ExtractError>) {
        self.0.page_read(page, result);
        self.1.page_read(page, result);
    }

    fn unclassified(&mut self, uid: &TagId) {
        self.0.unclassified(uid);
        self.1.unclassified(uid);
    }
}

/// `AA BB CC DD`
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char(' ')?;
            }
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

/// Hex followed by the printable characters: `48 69 00 FE  Hi..`
pub struct HexChars<'a>(pub &'a [u8]);

impl fmt::Display for HexChars<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  ", HexBytes(self.0))?;
        for &b in self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            };
            f.write_char(c)?;
        }
        Ok(())
    }
}

/// Reporter writing to the `log` facade, one line per block/page.
#[derive(Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn tag_detected(&mut self, uid: &TagId, family: TagFamily) {
        info!("Found an ISO14443A card");
        info!("  UID Length: {} bytes", uid.len());
        info!("  UID Value: {}", HexBytes(uid.as_bytes()));
        info!("  Family: {family}");
    }

    fn sector_read(&mut self, payload: &SectorPayload) {
        info!(
            "Sector {} (blocks {}..={}) read with key {} #{}",
            payload.sector,
            payload.first_block,
            payload.last_block(),
            payload.key_type,
            payload.key_index
        );
        for (block, data) in payload.blocks() {
            info!("BLOCK {block:02}: {}", HexChars(data));
        }
    }

    fn sector_failed(&mut self, uid: &TagId, error: &ExtractError) {
        warn!("Tag {uid}: {error}");
    }

    fn page_read(&mut self, page: u8, result: Result<&Page, &ExtractError>) {
        match result {
            Ok(data) => info!("PAGE {page:02}: {}", HexChars(data)),
            Err(_) => warn!("PAGE {page:02}: Unable to read the requested page!"),
        }
    }

    fn unclassified(&mut self, uid: &TagId) {
        info!(
            "Unsupported tag (UID length {} bytes), nothing to read",
            uid.len()
        );
    }
}

pub const DISPLAY_COLS: usize = 16;
pub const DISPLAY_ROWS: u8 = 2;

/// Text display with [`DISPLAY_ROWS`] rows of [`DISPLAY_COLS`] characters.
pub trait CharDisplay {
    type Error: fmt::Debug;

    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Replace a whole row. Longer text is cut, shorter text is padded.
    fn write_line(&mut self, row: u8, text: &str) -> Result<(), Self::Error>;
}

/// Fixed width line that silently drops what does not fit.
#[derive(Default)]
pub struct DisplayLine(heapless::String<DISPLAY_COLS>);

impl DisplayLine {
    pub fn format(args: fmt::Arguments<'_>) -> Self {
        let mut line = Self::default();
        // the writer never fails
        let _ = line.write_fmt(args);
        line
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Write for DisplayLine {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Echo results to a 16x2 display: UID on row 0, latest result on row 1.
pub struct DisplayReporter<D> {
    display: D,
}

impl<D: CharDisplay> DisplayReporter<D> {
    pub fn new(display: D) -> Self {
        Self { display }
    }

    pub fn into_inner(self) -> D {
        self.display
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    fn show(&mut self, row: u8, args: fmt::Arguments<'_>) {
        let line = DisplayLine::format(args);
        if let Err(err) = self.display.write_line(row, line.as_str()) {
            warn!("Display error {err:?}");
        }
    }
}

impl<D: CharDisplay> Reporter for DisplayReporter<D> {
    fn tag_detected(&mut self, uid: &TagId, family: TagFamily) {
        if let Err(err) = self.display.clear() {
            warn!("Display error {err:?}");
        }
        self.show(0, format_args!("{uid}"));
        match family {
            TagFamily::SecuredSector => self.show(1, format_args!("MIFARE CLASSIC")),
            TagFamily::SequentialPage => self.show(1, format_args!("NTAG2XX")),
            TagFamily::Unclassified(len) => self.show(1, format_args!("UID LEN {len}")),
        }
    }

    fn sector_read(&mut self, payload: &SectorPayload) {
        self.show(
            1,
            format_args!("S{} OK KEY#{}", payload.sector, payload.key_index),
        );
    }

    fn sector_failed(&mut self, _uid: &TagId, error: &ExtractError) {
        match error {
            ExtractError::AllKeysExhausted { sector } => {
                self.show(1, format_args!("S{sector} NO KEY"))
            }
            ExtractError::AddressUnreadable { unit, address } => {
                self.show(1, format_args!("{}{address} READ FAIL", unit_letter(*unit)))
            }
        }
    }

    fn page_read(&mut self, page: u8, result: Result<&Page, &ExtractError>) {
        match result {
            Ok(data) => self.show(
                1,
                format_args!(
                    "P{page:02} {:02X}{:02X}{:02X}{:02X}",
                    data[0], data[1], data[2], data[3]
                ),
            ),
            Err(_) => self.show(1, format_args!("P{page:02} READ FAIL")),
        }
    }

    fn unclassified(&mut self, uid: &TagId) {
        self.show(1, format_args!("UNKNOWN TAG {}B", uid.len()));
    }
}

fn unit_letter(unit: MemoryUnit) -> char {
    match unit {
        MemoryUnit::Block => 'B',
        MemoryUnit::Page => 'P',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Screen {
        rows: [String; 2],
        clears: usize,
    }

    impl CharDisplay for Screen {
        type Error = core::convert::Infallible;

        fn clear(&mut self) -> Result<(), Self::Error> {
            self.clears += 1;
            self.rows = Default::default();
            Ok(())
        }

        fn write_line(&mut self, row: u8, text: &str) -> Result<(), Self::Error> {
            self.rows[row as usize] = text.to_string();
            Ok(())
        }
    }

    #[test]
    fn hex_dump_formats() {
        assert_eq!(HexBytes(&[0xAA, 0x01]).to_string(), "AA 01");
        assert_eq!(
            HexChars(&[0x48, 0x69, 0x00, 0xFE]).to_string(),
            "48 69 00 FE  Hi.."
        );
    }

    #[test]
    fn display_line_truncates() {
        let line = DisplayLine::format(format_args!("{}", "0123456789ABCDEFGHIJ"));
        assert_eq!(line.as_str(), "0123456789ABCDEF");
    }

    #[test]
    fn display_shows_uid_and_page_results() {
        let mut reporter = DisplayReporter::new(Screen::default());
        let uid = TagId::from_slice(&[0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66]).unwrap();

        reporter.tag_detected(&uid, uid.family());
        assert_eq!(reporter.display().clears, 1);
        assert_eq!(reporter.display().rows[0], "04112233445566");
        assert_eq!(reporter.display().rows[1], "NTAG2XX");

        reporter.page_read(7, Ok(&[0x01, 0x02, 0x03, 0x04]));
        assert_eq!(reporter.display().rows[1], "P07 01020304");

        reporter.page_read(17, Err(&ExtractError::unreadable_page(17)));
        assert_eq!(reporter.display().rows[1], "P17 READ FAIL");
    }

    #[test]
    fn display_shows_sector_failures() {
        let mut reporter = DisplayReporter::new(Screen::default());
        let uid = TagId::from_slice(&[1, 2, 3, 4]).unwrap();

        reporter.sector_failed(&uid, &ExtractError::AllKeysExhausted { sector: 1 });
        assert_eq!(reporter.display().rows[1], "S1 NO KEY");

        reporter.sector_failed(&uid, &ExtractError::unreadable_block(5));
        assert_eq!(reporter.display().rows[1], "B5 READ FAIL");

        let odd = TagId::from_slice(&[0; 9]).unwrap();
        reporter.unclassified(&odd);
        assert_eq!(reporter.into_inner().rows[1], "UNKNOWN TAG 9B");
    }
}
