//! Slotted-page layout for RM records, living inside the caller-owned
//! suffix of a [`pf::Page`].
//!
//! Header and slot-directory entries are fixed-width `serde` structs
//! encoded through `bincode::config::legacy()` into page-relative byte
//! slices, the same "page holds raw bytes, header/slot types are encoded
//! into and out of it on demand" technique `pf::page` uses for its own
//! file header.

use bincode::config::{self, Config};
use bincode::serde::{decode_from_slice, encode_into_slice};
use serde::{Deserialize, Serialize};

use crate::error::{RmError, RmResult};

/// `{num_slots: i32, free_space_offset: i32}` at the start of the page.
pub(crate) const HEADER_BYTES: usize = 8;
/// `{offset: i32, length: i32}` — one entry per slot in the directory.
pub(crate) const SLOT_BYTES: usize = 8;

/// A slot directory entry is tombstoned once deleted.
pub(crate) const TOMBSTONE_OFFSET: i32 = -1;

fn bincode_config() -> impl Config {
    config::legacy()
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct PageHeader {
    pub num_slots: i32,
    pub free_space_offset: i32,
}

impl PageHeader {
    pub fn decode(data: &[u8]) -> RmResult<Self> {
        let (header, read) = decode_from_slice(&data[..HEADER_BYTES], bincode_config())
            .map_err(|e| RmError::Codec(format!("read page header failed: {e}")))?;
        debug_assert_eq!(read, HEADER_BYTES);
        Ok(header)
    }

    pub fn encode(self, data: &mut [u8]) -> RmResult<()> {
        let written = encode_into_slice(self, &mut data[..HEADER_BYTES], bincode_config())
            .map_err(|e| RmError::Codec(format!("write page header failed: {e}")))?;
        debug_assert_eq!(written, HEADER_BYTES);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct Slot {
    pub offset: i32,
    pub length: i32,
}

impl Slot {
    pub fn is_tombstone(self) -> bool {
        self.offset == TOMBSTONE_OFFSET
    }
}

pub(crate) fn slot_offset(idx: i32) -> usize {
    HEADER_BYTES + idx as usize * SLOT_BYTES
}

pub(crate) fn read_slot(data: &[u8], idx: i32) -> RmResult<Slot> {
    let start = slot_offset(idx);
    let (slot, read) = decode_from_slice(&data[start..start + SLOT_BYTES], bincode_config())
        .map_err(|e| RmError::Codec(format!("read slot failed: {e}")))?;
    debug_assert_eq!(read, SLOT_BYTES);
    Ok(slot)
}

pub(crate) fn write_slot(data: &mut [u8], idx: i32, slot: Slot) -> RmResult<()> {
    let start = slot_offset(idx);
    let written = encode_into_slice(slot, &mut data[start..start + SLOT_BYTES], bincode_config())
        .map_err(|e| RmError::Codec(format!("write slot failed: {e}")))?;
    debug_assert_eq!(written, SLOT_BYTES);
    Ok(())
}

/// Initializes a freshly allocated page as an empty slotted page: no
/// slots, free space starting at the end of the page.
pub(crate) fn init_page(data: &mut [u8]) -> RmResult<()> {
    PageHeader {
        num_slots: 0,
        free_space_offset: data.len() as i32,
    }
    .encode(data)
}

/// Bytes available for a new slot + payload, given the current header.
pub(crate) fn free_space(header: PageHeader) -> i32 {
    let slots_end = HEADER_BYTES as i32 + header.num_slots * SLOT_BYTES as i32;
    header.free_space_offset - slots_end
}
