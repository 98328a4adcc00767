use bincode::config::{self, Config};
use bincode::serde::{decode_from_slice, encode_into_slice};
use common::PageNum;
use serde::{Deserialize, Serialize};

use crate::error::{PfError, PfResult};

/// Fixed page size for every paged file. No variable page sizes, so this
/// is a compile-time constant rather than a `Config` field that anything
/// actually reads.
pub const PAGE_SIZE: usize = 4096;

/// Bytes reserved at the front of each on-disk page frame for the
/// `next_free` free-list sentinel. Callers never see these bytes; the
/// buffer pool strips them off before handing back a [`Page`].
pub(crate) const FRAME_HEADER_BYTES: usize = 4;

/// Bytes available to callers within a single page.
pub const CALLER_DATA_SIZE: usize = PAGE_SIZE - FRAME_HEADER_BYTES;

/// Marks a frame as holding live, allocated data (as opposed to a link in
/// the free list). Chosen distinct from [`LIST_END`] so the two sentinels
/// can't be confused when reasoning about a freshly-truncated free list.
pub const USED: i32 = -1;

/// Terminates the free list: "no next free page".
pub const LIST_END: i32 = -2;

fn bincode_config() -> impl Config {
    config::legacy()
}

/// A page's caller-owned bytes, as handed out by the buffer pool. Never
/// includes the `next_free` link word that precedes it on disk.
#[derive(Debug, Clone)]
pub struct Page {
    pub page_num: PageNum,
    pub data: Vec<u8>,
}

impl Page {
    pub fn new(page_num: PageNum) -> Self {
        Self {
            page_num,
            data: vec![0u8; CALLER_DATA_SIZE],
        }
    }
}

/// Splits a raw `PAGE_SIZE`-byte frame read from disk into its free-list
/// link word and the caller-owned remainder.
pub(crate) fn decode_frame(raw: &[u8]) -> PfResult<(i32, Vec<u8>)> {
    debug_assert_eq!(raw.len(), PAGE_SIZE);
    let (next_free, read) = decode_from_slice(&raw[..FRAME_HEADER_BYTES], bincode_config())
        .map_err(|_| PfError::IncompleteRead)?;
    debug_assert_eq!(read, FRAME_HEADER_BYTES);
    Ok((next_free, raw[FRAME_HEADER_BYTES..].to_vec()))
}

/// Inverse of [`decode_frame`]: assembles a `PAGE_SIZE`-byte on-disk frame
/// from a free-list link word and caller data.
pub(crate) fn encode_frame(next_free: i32, data: &[u8]) -> PfResult<Vec<u8>> {
    debug_assert_eq!(data.len(), CALLER_DATA_SIZE);
    let mut raw = vec![0u8; PAGE_SIZE];
    let written = encode_into_slice(next_free, &mut raw[..FRAME_HEADER_BYTES], bincode_config())
        .map_err(|_| PfError::IncompleteWrite)?;
    debug_assert_eq!(written, FRAME_HEADER_BYTES);
    raw[FRAME_HEADER_BYTES..].copy_from_slice(data);
    Ok(raw)
}

/// On-disk file header: `{first_free, num_pages}`, stored in the first
/// `FILE_HEADER_BYTES` bytes of every paged file, ahead of page 0.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct FileHeader {
    pub first_free: PageNum,
    pub num_pages: i32,
}

pub(crate) const FILE_HEADER_BYTES: usize = 8;

impl FileHeader {
    pub fn decode(raw: &[u8]) -> PfResult<Self> {
        debug_assert_eq!(raw.len(), FILE_HEADER_BYTES);
        let (header, read) =
            decode_from_slice(raw, bincode_config()).map_err(|_| PfError::IncompleteRead)?;
        debug_assert_eq!(read, FILE_HEADER_BYTES);
        Ok(header)
    }

    pub fn encode(self) -> PfResult<[u8; FILE_HEADER_BYTES]> {
        let mut raw = [0u8; FILE_HEADER_BYTES];
        let written = encode_into_slice(self, &mut raw, bincode_config())
            .map_err(|_| PfError::IncompleteWrite)?;
        debug_assert_eq!(written, FILE_HEADER_BYTES);
        Ok(raw)
    }
}
