//! tagscan PC simulator
//!
//! Runs the tag reading session against a simulated RF field instead of a
//! PN532, echoing results to the log and to a 16x2 display drawn in the
//! terminal.
//!
//! # Usage
//! ```bash
//! # Built-in demo: empty field, MIFARE Classic, NTAG with a bad page,
//! # Classic with an unknown key, 9 byte UID
//! cargo run -p tagscan-simulator
//!
//! # Own scenario, own key catalog
//! TAGSCAN_CONFIG=config.json cargo run -p tagscan-simulator -- my_scenario.json
//! ```

mod config;
mod display;
mod field;

use embedded_hal::delay::DelayNs;
use log::info;
use tagscan_core::{DisplayReporter, KeyCatalog, LogReporter, Session};

use crate::config::Config;
use crate::display::TerminalDisplay;
use crate::field::{Scenario, SimulatedField};

/// Host sleep standing in for the device delay
struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let scenario = match std::env::args().nth(1) {
        Some(path) => Scenario::load(&path)?,
        None => Scenario::demo()?,
    };
    let tags = scenario.into_tags()?;
    let cycles = tags.len();

    info!("tagscan simulator - {cycles} poll cycles");
    info!(
        "Target sector {}, key type {}, {} keys, {} pages",
        config.session.target_sector,
        config.session.key_type,
        config.keys.len(),
        config.session.page_count
    );

    let catalog = KeyCatalog::new(&config.keys)?;
    let poll_interval_ms = config.session.poll_interval_ms;
    let reporter = (
        LogReporter,
        DisplayReporter::new(TerminalDisplay::default()),
    );
    let mut session = Session::new(SimulatedField::new(tags), reporter, catalog, config.session)?;
    let mut delay = StdDelay;

    for cycle in 1..=cycles {
        let outcome = session.poll_once();
        info!("Cycle {cycle}: {outcome:?}");
        println!("{}", session.reporter().1.display());
        delay.delay_ms(poll_interval_ms);
    }

    let stats = session.driver().stats();
    info!(
        "Driver calls: {} polls, {} authentications, {} block reads, {} page reads",
        stats.polls, stats.auths, stats.block_reads, stats.page_reads
    );
    Ok(())
}
