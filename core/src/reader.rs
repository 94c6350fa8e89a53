//! Single unit reads. No retries here, the session decides what a failure means.

use log::warn;

use crate::error::ExtractError;
use crate::tag::{Block, Page};
use crate::transceiver::Transceiver;

pub fn read_block<T>(driver: &mut T, block: u8) -> Result<Block, ExtractError>
where
    T: Transceiver + ?Sized,
{
    driver.read_data_block(block).map_err(|err| {
        warn!("Error {err:?} during read of block {block}");
        ExtractError::unreadable_block(block)
    })
}

pub fn read_page<T>(driver: &mut T, page: u8) -> Result<Page, ExtractError>
where
    T: Transceiver + ?Sized,
{
    driver.read_sequential_page(page).map_err(|err| {
        warn!("Error {err:?} during read of page {page}");
        ExtractError::unreadable_page(page)
    })
}
