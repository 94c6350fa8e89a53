//! Character LCD module.
//!
//! Supports:
//! - HD44780 16x2 behind a PCF8574 I2C backpack (the common "LCD1602 I2C"
//!   module), address 0x27 by default
//!
//! Hardware connection shares the PN532 bus:
//! - GPIO21 -> SDA
//! - GPIO22 -> SCL
//! - 5V / GND

pub mod hd44780;

pub use hd44780::{Hd44780, LCD_I2C_ADDR};
