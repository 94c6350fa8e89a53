//! 16x2 character display drawn in the terminal.

use std::convert::Infallible;
use std::fmt;

use tagscan_core::report::{CharDisplay, DISPLAY_COLS, DISPLAY_ROWS};

#[derive(Debug, Default)]
pub struct TerminalDisplay {
    rows: [String; DISPLAY_ROWS as usize],
}

impl TerminalDisplay {
    pub fn row(&self, row: usize) -> &str {
        &self.rows[row]
    }
}

impl CharDisplay for TerminalDisplay {
    type Error = Infallible;

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.rows.iter_mut().for_each(String::clear);
        Ok(())
    }

    fn write_line(&mut self, row: u8, text: &str) -> Result<(), Self::Error> {
        if let Some(line) = self.rows.get_mut(usize::from(row)) {
            *line = text.chars().take(DISPLAY_COLS).collect();
        }
        Ok(())
    }
}

impl fmt::Display for TerminalDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let border = "-".repeat(DISPLAY_COLS);
        writeln!(f, "+{border}+")?;
        for row in &self.rows {
            writeln!(f, "|{row:<width$}|", width = DISPLAY_COLS)?;
        }
        write!(f, "+{border}+")
    }
}
