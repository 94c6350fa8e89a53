//! HD44780 driver in 4-bit mode through a PCF8574 port expander.
//!
//! Expander pins:
//! - P0 -> RS
//! - P1 -> RW (always write)
//! - P2 -> EN
//! - P3 -> backlight
//! - P4..P7 -> D4..D7

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::report::{CharDisplay, DISPLAY_COLS, DISPLAY_ROWS};

pub const LCD_I2C_ADDR: u8 = 0x27;

const RS: u8 = 0x01;
const EN: u8 = 0x04;
const BACKLIGHT: u8 = 0x08;

/// HD44780 instruction set
#[allow(dead_code)]
pub mod instructions {
    pub const CLEAR_DISPLAY: u8 = 0x01;
    pub const RETURN_HOME: u8 = 0x02;
    pub const ENTRY_MODE_SET: u8 = 0x04;
    pub const DISPLAY_CONTROL: u8 = 0x08;
    pub const FUNCTION_SET: u8 = 0x20;
    pub const SET_DDRAM_ADDR: u8 = 0x80;

    pub const ENTRY_INCREMENT: u8 = 0x02;
    pub const DISPLAY_ON: u8 = 0x04;
    pub const CURSOR_ON: u8 = 0x02;
    pub const BLINK_ON: u8 = 0x01;
    pub const TWO_LINES: u8 = 0x08;
    pub const FOUR_BIT_MODE: u8 = 0x00;
    pub const FONT_5X8: u8 = 0x00;
}

use instructions::*;

const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

pub struct Hd44780<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    backlight: u8,
}

impl<I2C, D, E> Hd44780<I2C, D>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
{
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_address(i2c, delay, LCD_I2C_ADDR)
    }

    pub fn with_address(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address,
            backlight: BACKLIGHT,
        }
    }

    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    /// Power-on initialization by instruction, HD44780 datasheet figure 24.
    pub fn init(&mut self) -> Result<(), E> {
        self.delay.delay_ms(50);
        self.expander_write(0)?;
        self.delay.delay_ms(1);

        // three times 8-bit mode to get a known state, then 4-bit
        self.write_nibble(0x30)?;
        self.delay.delay_us(4500);
        self.write_nibble(0x30)?;
        self.delay.delay_us(4500);
        self.write_nibble(0x30)?;
        self.delay.delay_us(150);
        self.write_nibble(0x20)?;

        self.command(FUNCTION_SET | FOUR_BIT_MODE | TWO_LINES | FONT_5X8)?;
        self.command(DISPLAY_CONTROL | DISPLAY_ON)?;
        self.clear()?;
        self.command(ENTRY_MODE_SET | ENTRY_INCREMENT)?;
        self.command(RETURN_HOME)?;
        self.delay.delay_us(2000);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), E> {
        self.command(CLEAR_DISPLAY)?;
        self.delay.delay_us(2000);
        Ok(())
    }

    pub fn set_backlight(&mut self, on: bool) -> Result<(), E> {
        self.backlight = if on { BACKLIGHT } else { 0 };
        self.expander_write(0)
    }

    /// Out of range positions are clamped to the last column/row.
    pub fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), E> {
        let row = usize::from(row.min(DISPLAY_ROWS - 1));
        let col = col.min(DISPLAY_COLS as u8 - 1);
        self.command(SET_DDRAM_ADDR | (col + ROW_OFFSETS[row]))
    }

    /// Characters outside printable ASCII show as `?`.
    pub fn print(&mut self, text: &str) -> Result<(), E> {
        for c in text.chars() {
            let byte = if c.is_ascii_graphic() || c == ' ' {
                c as u8
            } else {
                b'?'
            };
            self.send(byte, RS)?;
        }
        Ok(())
    }

    fn command(&mut self, value: u8) -> Result<(), E> {
        self.send(value, 0)
    }

    fn send(&mut self, value: u8, mode: u8) -> Result<(), E> {
        self.write_nibble((value & 0xF0) | mode)?;
        self.write_nibble(((value << 4) & 0xF0) | mode)
    }

    fn write_nibble(&mut self, value: u8) -> Result<(), E> {
        self.expander_write(value)?;
        self.expander_write(value | EN)?;
        self.delay.delay_us(1);
        self.expander_write(value & !EN)?;
        self.delay.delay_us(50);
        Ok(())
    }

    fn expander_write(&mut self, data: u8) -> Result<(), E> {
        self.i2c.write(self.address, &[data | self.backlight])
    }
}

impl<I2C, D, E> CharDisplay for Hd44780<I2C, D>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
    E: core::fmt::Debug,
{
    type Error = E;

    fn clear(&mut self) -> Result<(), E> {
        Hd44780::clear(self)
    }

    fn write_line(&mut self, row: u8, text: &str) -> Result<(), E> {
        if row >= DISPLAY_ROWS {
            return Ok(());
        }
        self.set_cursor(0, row)?;
        let mut written = 0;
        for c in text.chars().take(DISPLAY_COLS) {
            let mut utf8 = [0u8; 4];
            self.print(c.encode_utf8(&mut utf8))?;
            written += 1;
        }
        for _ in written..DISPLAY_COLS {
            self.print(" ")?;
        }
        Ok(())
    }
}
