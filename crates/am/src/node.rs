//! Owned, decoded representations of AM leaf and internal pages.
//!
//! Rather than patching header/slot bytes in place the way the original C
//! shifts memory with `memcpy`, a page is fully decoded into one of these
//! structs, mutated with ordinary `Vec` operations, and fully
//! re-serialized on write. The rec-id free list exists in the on-disk
//! layout to reclaim byte ranges a `memcpy`-based implementation would otherwise
//! leak; a full rebuild on every write never fragments in the first
//! place, so this implementation always re-serializes with an empty free
//! list (documented as a resolved design decision in DESIGN.md) while
//! still keeping the `free_list_ptr`/`num_in_free_list` header fields for
//! on-disk format compatibility.

use common::PageNum;

use crate::error::{AmError, AmResult};
use crate::page::{
    IntHeader, LeafHeader, CHILD_PTR_BYTES, INT_HEADER_BYTES, LEAF_HEADER_BYTES, RECID_NODE_BYTES,
};

#[derive(Debug, Clone)]
pub(crate) struct LeafEntry {
    pub key: Vec<u8>,
    /// Rec-ids for this key, head-first: index 0 is the most recently
    /// spliced-in id, matching "splice the new rec-id into the head of
    /// that key's list".
    pub rec_ids: Vec<i32>,
}

#[derive(Debug, Clone)]
pub(crate) struct LeafNode {
    pub next_leaf_page: PageNum,
    pub attr_length: usize,
    pub max_keys: u16,
    pub entries: Vec<LeafEntry>,
}

impl LeafNode {
    pub fn empty(attr_length: usize, max_keys: u16) -> Self {
        Self {
            next_leaf_page: common::NO_PAGE,
            attr_length,
            max_keys,
            entries: Vec::new(),
        }
    }

    pub fn decode(data: &[u8]) -> AmResult<Self> {
        let header = LeafHeader::decode(data)?;
        let attr_length = header.attr_length as usize;
        let rec_size = attr_length + 2;
        let mut entries = Vec::with_capacity(header.num_keys as usize);
        for i in 0..header.num_keys as usize {
            let start = LEAF_HEADER_BYTES + i * rec_size;
            let key = data[start..start + attr_length].to_vec();
            let mut head = u16::from_le_bytes(
                data[start + attr_length..start + attr_length + 2]
                    .try_into()
                    .unwrap(),
            );
            let mut rec_ids = Vec::new();
            while head != 0 {
                let off = head as usize;
                let rec_id = i32::from_le_bytes(data[off..off + 4].try_into().unwrap());
                let next = u16::from_le_bytes(data[off + 4..off + 6].try_into().unwrap());
                rec_ids.push(rec_id);
                head = next;
            }
            entries.push(LeafEntry { key, rec_ids });
        }
        Ok(Self {
            next_leaf_page: header.next_leaf_page,
            attr_length,
            max_keys: header.max_keys,
            entries,
        })
    }

    pub fn encode(&self, data: &mut [u8]) -> AmResult<()> {
        let rec_size = self.attr_length + 2;
        let key_ptr = LEAF_HEADER_BYTES + self.entries.len() * rec_size;
        let mut cursor = data.len();

        for (i, entry) in self.entries.iter().enumerate() {
            let start = LEAF_HEADER_BYTES + i * rec_size;
            data[start..start + self.attr_length].copy_from_slice(&entry.key);

            let mut next_ptr: u16 = 0;
            for &rid in entry.rec_ids.iter().rev() {
                if cursor < key_ptr + RECID_NODE_BYTES {
                    return Err(AmError::Internal("leaf page overflow"));
                }
                cursor -= RECID_NODE_BYTES;
                data[cursor..cursor + 4].copy_from_slice(&rid.to_le_bytes());
                data[cursor + 4..cursor + 6].copy_from_slice(&next_ptr.to_le_bytes());
                next_ptr = cursor as u16;
            }
            data[start + self.attr_length..start + self.attr_length + 2]
                .copy_from_slice(&next_ptr.to_le_bytes());
        }

        LeafHeader {
            tag: crate::page::LEAF_TAG,
            next_leaf_page: self.next_leaf_page,
            rec_id_ptr: cursor as u16,
            key_ptr: key_ptr as u16,
            free_list_ptr: 0,
            num_in_free_list: 0,
            attr_length: self.attr_length as u16,
            num_keys: self.entries.len() as u16,
            max_keys: self.max_keys,
        }
        .encode(data)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct IntNode {
    pub attr_length: usize,
    pub max_keys: u16,
    pub keys: Vec<Vec<u8>>,
    pub children: Vec<PageNum>,
}

impl IntNode {
    pub fn decode(data: &[u8]) -> AmResult<Self> {
        let header = IntHeader::decode(data)?;
        let attr_length = header.attr_length as usize;
        let rec_size = CHILD_PTR_BYTES + attr_length;
        let mut children = Vec::with_capacity(header.num_keys as usize + 1);
        let mut keys = Vec::with_capacity(header.num_keys as usize);

        let first_child_start = INT_HEADER_BYTES;
        children.push(i32::from_le_bytes(
            data[first_child_start..first_child_start + 4]
                .try_into()
                .unwrap(),
        ));
        for i in 0..header.num_keys as usize {
            let key_start = INT_HEADER_BYTES + CHILD_PTR_BYTES + i * rec_size;
            keys.push(data[key_start..key_start + attr_length].to_vec());
            let child_start = key_start + attr_length;
            children.push(i32::from_le_bytes(
                data[child_start..child_start + 4].try_into().unwrap(),
            ));
        }
        Ok(Self {
            attr_length,
            max_keys: header.max_keys,
            keys,
            children,
        })
    }

    pub fn encode(&self, data: &mut [u8]) -> AmResult<()> {
        assert_eq!(self.children.len(), self.keys.len() + 1);
        let rec_size = CHILD_PTR_BYTES + self.attr_length;
        let needed = INT_HEADER_BYTES + CHILD_PTR_BYTES + self.keys.len() * rec_size;
        if needed > data.len() {
            return Err(AmError::Internal("internal page overflow"));
        }
        data[INT_HEADER_BYTES..INT_HEADER_BYTES + 4]
            .copy_from_slice(&self.children[0].to_le_bytes());
        for (i, key) in self.keys.iter().enumerate() {
            let key_start = INT_HEADER_BYTES + CHILD_PTR_BYTES + i * rec_size;
            data[key_start..key_start + self.attr_length].copy_from_slice(key);
            let child_start = key_start + self.attr_length;
            data[child_start..child_start + 4]
                .copy_from_slice(&self.children[i + 1].to_le_bytes());
        }
        IntHeader {
            tag: crate::page::INTERNAL_TAG,
            num_keys: self.keys.len() as u16,
            max_keys: self.max_keys,
            attr_length: self.attr_length as u16,
        }
        .encode(data)?;
        Ok(())
    }
}
