//! On-disk header layouts for AM leaf and internal pages.
//!
//! The fixed-width header at the front of every page is a `serde` struct
//! encoded through `bincode::config::legacy()`, the same technique
//! `pf::page` and `rm::page` use for their own fixed-width headers. The
//! variable-length body that follows (packed keys and the rec-id free
//! list) has no uniform record shape bincode can describe in one shot, so
//! it stays a set of explicit little-endian accessors, exactly as `rm`
//! leaves record payload bytes as a raw copy rather than a decoded type.

use bincode::config::{self, Config};
use bincode::serde::{decode_from_slice, encode_into_slice};
use common::PageNum;
use serde::{Deserialize, Serialize};

use crate::error::{AmError, AmResult};

/// First byte of every AM page: `'l'` for leaf, `'i'` for internal.
pub(crate) const LEAF_TAG: u8 = b'l';
pub(crate) const INTERNAL_TAG: u8 = b'i';

/// Size in bytes of a child page pointer in an internal node.
pub(crate) const CHILD_PTR_BYTES: usize = 4;
/// Size in bytes of one rec-id-list node: `{rec_id: i32, next: i16}`.
pub(crate) const RECID_NODE_BYTES: usize = 6;

/// `{tag, next_leaf_page, rec_id_ptr, key_ptr, free_list_ptr,
/// num_in_free_list, attr_length, num_keys, max_keys}`.
pub(crate) const LEAF_HEADER_BYTES: usize = 1 + 4 + 2 * 7;
/// `{tag, num_keys, max_keys, attr_length}`.
pub(crate) const INT_HEADER_BYTES: usize = 1 + 2 * 3;

fn bincode_config() -> impl Config {
    config::legacy()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct LeafHeader {
    pub tag: u8,
    pub next_leaf_page: PageNum,
    pub rec_id_ptr: u16,
    pub key_ptr: u16,
    pub free_list_ptr: u16,
    pub num_in_free_list: u16,
    pub attr_length: u16,
    pub num_keys: u16,
    pub max_keys: u16,
}

impl LeafHeader {
    pub fn decode(data: &[u8]) -> AmResult<Self> {
        let (header, read): (Self, usize) =
            decode_from_slice(&data[..LEAF_HEADER_BYTES], bincode_config())
                .map_err(|e| AmError::Codec(format!("read leaf header failed: {e}")))?;
        debug_assert_eq!(read, LEAF_HEADER_BYTES);
        debug_assert_eq!(header.tag, LEAF_TAG);
        Ok(header)
    }

    pub fn encode(self, data: &mut [u8]) -> AmResult<()> {
        let written = encode_into_slice(self, &mut data[..LEAF_HEADER_BYTES], bincode_config())
            .map_err(|e| AmError::Codec(format!("write leaf header failed: {e}")))?;
        debug_assert_eq!(written, LEAF_HEADER_BYTES);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct IntHeader {
    pub tag: u8,
    pub num_keys: u16,
    pub max_keys: u16,
    pub attr_length: u16,
}

impl IntHeader {
    pub fn decode(data: &[u8]) -> AmResult<Self> {
        let (header, read): (Self, usize) =
            decode_from_slice(&data[..INT_HEADER_BYTES], bincode_config())
                .map_err(|e| AmError::Codec(format!("read internal header failed: {e}")))?;
        debug_assert_eq!(read, INT_HEADER_BYTES);
        debug_assert_eq!(header.tag, INTERNAL_TAG);
        Ok(header)
    }

    pub fn encode(self, data: &mut [u8]) -> AmResult<()> {
        let written = encode_into_slice(self, &mut data[..INT_HEADER_BYTES], bincode_config())
            .map_err(|e| AmError::Codec(format!("write internal header failed: {e}")))?;
        debug_assert_eq!(written, INT_HEADER_BYTES);
        Ok(())
    }
}

/// Returns whether the page's first byte marks it as a leaf.
pub(crate) fn is_leaf(data: &[u8]) -> bool {
    data[0] == LEAF_TAG
}

/// Computes `max_keys` for an internal node: `(page_size - int_header -
/// child_ptr) / (child_ptr + attr_length)`, rounded down to the nearest
/// even number (internal nodes must have an even `max_keys` so a split
/// divides them exactly in half). The same value is reused for leaf pages.
pub(crate) fn compute_max_keys(page_size: usize, attr_length: usize) -> u16 {
    let raw = (page_size - INT_HEADER_BYTES - CHILD_PTR_BYTES) / (CHILD_PTR_BYTES + attr_length);
    let even = if raw % 2 != 0 { raw - 1 } else { raw };
    even as u16
}
