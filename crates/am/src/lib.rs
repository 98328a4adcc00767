//! B+-tree secondary index over a single `int`, `float`, or fixed-length
//! `char` attribute, built on top of [`pf::PfManager`].
//!
//! An index lives in its own paged file, named `"<base>.<index_no>"` by
//! convention. Page 0 is always the root: it starts out as an empty leaf
//! and is reinitialized in place as an internal node the first time it
//! splits, so the root's page number never changes over the life of the
//! index. Every other page is a leaf or internal node allocated as the
//! tree grows; none are ever freed, since this implementation has no
//! merge/rebalance on delete.

mod compare;
mod error;
mod node;
mod page;
mod search;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use common::{AttrType, CompareOp, PageNum};
use pf::PfManager;

pub use error::{AmError, AmResult};

use node::{IntNode, LeafEntry, LeafNode};
use search::{matches_predicate, search_internal, search_leaf, SearchResult};

fn index_path(base: impl AsRef<Path>, index_no: i32) -> PathBuf {
    let mut name = base.as_ref().as_os_str().to_os_string();
    name.push(format!(".{index_no}"));
    PathBuf::from(name)
}

/// A single open B+-tree index.
pub struct BTreeIndex {
    fd: i32,
    attr_type: AttrType,
    attr_length: usize,
    root_page_num: PageNum,
    /// `(internal_page, child_index)` ancestors recorded while descending
    /// for the current operation, innermost last. Cleared on every return
    /// path, success or failure, so a failed operation never leaves stale
    /// ancestors for the next one to misread.
    stack: Vec<(PageNum, usize)>,
    open_scans: usize,
    max_scans: usize,
}

impl BTreeIndex {
    /// Creates a new, empty index file. Does not leave the index open;
    /// call [`BTreeIndex::open`] afterwards to use it.
    pub fn create(
        pf: &mut PfManager,
        base: impl AsRef<Path>,
        index_no: i32,
        attr_type: AttrType,
        attr_length: i32,
    ) -> AmResult<()> {
        if !attr_type.is_valid_length(attr_length) {
            return Err(AmError::InvalidAttrLength(attr_length));
        }
        let path = index_path(base, index_no);
        pf.create_file(&path)?;
        let fd = pf.open_file(&path)?;
        let max_keys = page::compute_max_keys(pf::CALLER_DATA_SIZE, attr_length as usize);
        let leaf = LeafNode::empty(attr_length as usize, max_keys);
        let result = (|| -> AmResult<()> {
            let buf = pf.alloc_page(fd)?;
            debug_assert_eq!(buf.page_num, 0, "a freshly created index's root must be page 0");
            leaf.encode(&mut buf.data)?;
            pf.unfix_page(fd, 0, true)?;
            Ok(())
        })();
        pf.close_file(fd)?;
        result
    }

    /// Removes an index file from disk. The index must not be open.
    pub fn destroy(pf: &PfManager, base: impl AsRef<Path>, index_no: i32) -> AmResult<()> {
        pf.destroy_file(index_path(base, index_no))?;
        Ok(())
    }

    /// Opens an existing index. `attr_type` is supplied by the caller
    /// (it is never persisted on disk); `attr_length` is recovered from
    /// the root page's header and checked against every later operation.
    pub fn open(
        pf: &mut PfManager,
        base: impl AsRef<Path>,
        index_no: i32,
        attr_type: AttrType,
        max_scans: usize,
    ) -> AmResult<Self> {
        let path = index_path(base, index_no);
        let fd = pf.open_file(&path)?;
        let buf = pf.get_this_page(fd, 0)?;
        let attr_length = if page::is_leaf(&buf.data) {
            page::LeafHeader::decode(&buf.data)?.attr_length as usize
        } else {
            page::IntHeader::decode(&buf.data)?.attr_length as usize
        };
        pf.unfix_page(fd, 0, false)?;
        Ok(Self {
            fd,
            attr_type,
            attr_length,
            root_page_num: 0,
            stack: Vec::new(),
            open_scans: 0,
            max_scans,
        })
    }

    /// Closes the index's underlying file. All scans must already be closed.
    pub fn close(self, pf: &mut PfManager) -> AmResult<()> {
        pf.close_file(self.fd)?;
        Ok(())
    }

    pub fn fd(&self) -> i32 {
        self.fd
    }

    fn validate_value(&self, value: &[u8]) -> AmResult<()> {
        if value.len() != self.attr_length {
            return Err(AmError::InvalidValue);
        }
        Ok(())
    }

    /// Walks `children[0]` from the root down to the leftmost leaf. The
    /// leftmost leaf's page number is whatever is found this way, not a
    /// value remembered since index creation: after the root's first
    /// split turns it into an internal node, the content that used to
    /// live at page 0 is relocated, and this walk finds it wherever it
    /// ended up.
    fn leftmost_leaf(&mut self, pf: &mut PfManager) -> AmResult<PageNum> {
        let mut page_num = self.root_page_num;
        loop {
            let buf = pf.get_this_page(self.fd, page_num)?;
            if page::is_leaf(&buf.data) {
                pf.unfix_page(self.fd, page_num, false)?;
                return Ok(page_num);
            }
            let node = IntNode::decode(&buf.data)?;
            pf.unfix_page(self.fd, page_num, false)?;
            page_num = node.children[0];
        }
    }

    /// Descends from the root to the leaf that would hold `value`,
    /// recording `(page, child_index)` for every internal ancestor
    /// visited. Every page touched is unfixed before this returns, on
    /// both the success and error paths.
    fn search(&mut self, pf: &mut PfManager, value: &[u8]) -> AmResult<(PageNum, SearchResult)> {
        self.stack.clear();
        let mut page_num = self.root_page_num;
        loop {
            let outcome = (|| -> AmResult<Option<(PageNum, SearchResult)>> {
                let buf = pf.get_this_page(self.fd, page_num)?;
                if page::is_leaf(&buf.data) {
                    let header = page::LeafHeader::decode(&buf.data)?;
                    if header.attr_length as usize != self.attr_length {
                        pf.unfix_page(self.fd, page_num, false)?;
                        return Err(AmError::InvalidAttrLength(header.attr_length as i32));
                    }
                    let node = LeafNode::decode(&buf.data)?;
                    pf.unfix_page(self.fd, page_num, false)?;
                    let result = search_leaf(&node, self.attr_type, value);
                    return Ok(Some((page_num, result)));
                }
                let node = IntNode::decode(&buf.data)?;
                if node.attr_length != self.attr_length {
                    pf.unfix_page(self.fd, page_num, false)?;
                    return Err(AmError::InvalidAttrLength(node.attr_length as i32));
                }
                pf.unfix_page(self.fd, page_num, false)?;
                let (child_idx, child_page) = search_internal(&node, self.attr_type, value);
                self.stack.push((page_num, child_idx));
                page_num = child_page;
                Ok(None)
            })();
            match outcome {
                Ok(Some(found)) => return Ok(found),
                Ok(None) => continue,
                Err(e) => {
                    self.stack.clear();
                    return Err(e);
                }
            }
        }
    }

    /// Inserts `rec_id` under `value`. If `value` is already present the
    /// new id is spliced onto the head of its rec-id list instead of
    /// creating a second key entry.
    pub fn insert(&mut self, pf: &mut PfManager, value: &[u8], rec_id: i32) -> AmResult<()> {
        self.validate_value(value)?;
        let (leaf_page, result) = self.search(pf, value)?;

        let buf = pf.get_this_page(self.fd, leaf_page)?;
        let mut node = LeafNode::decode(&buf.data)?;
        pf.unfix_page(self.fd, leaf_page, false)?;

        if (node.entries.len() as u16) < node.max_keys {
            match result {
                SearchResult::Found(idx) => node.entries[idx].rec_ids.insert(0, rec_id),
                SearchResult::NotFound(idx) => node.entries.insert(
                    idx,
                    LeafEntry {
                        key: value.to_vec(),
                        rec_ids: vec![rec_id],
                    },
                ),
            }
            let buf = pf.get_this_page(self.fd, leaf_page)?;
            node.encode(&mut buf.data)?;
            pf.unfix_page(self.fd, leaf_page, true)?;
            self.stack.clear();
            return Ok(());
        }

        self.split_leaf(pf, leaf_page, node, result, value, rec_id)
    }

    /// Splits a full leaf in two, keeping the smaller/left half on the
    /// original page number and linking a newly allocated page to the
    /// right via `next_leaf_page`. A split at the root is a special
    /// case: the root's old content is copied onto a brand-new page and
    /// page 0 is reinitialized as the new internal root, so the root's
    /// page number invariant (always 0) holds.
    fn split_leaf(
        &mut self,
        pf: &mut PfManager,
        leaf_page: PageNum,
        mut node: LeafNode,
        result: SearchResult,
        value: &[u8],
        rec_id: i32,
    ) -> AmResult<()> {
        let half = node.entries.len() / 2;
        let mut right_entries = node.entries.split_off(half);
        let mut left_entries = std::mem::take(&mut node.entries);

        match result {
            SearchResult::Found(idx) => {
                if idx < half {
                    left_entries[idx].rec_ids.insert(0, rec_id);
                } else {
                    right_entries[idx - half].rec_ids.insert(0, rec_id);
                }
            }
            SearchResult::NotFound(idx) => {
                if idx <= half {
                    left_entries.insert(
                        idx,
                        LeafEntry {
                            key: value.to_vec(),
                            rec_ids: vec![rec_id],
                        },
                    );
                } else {
                    right_entries.insert(
                        idx - half,
                        LeafEntry {
                            key: value.to_vec(),
                            rec_ids: vec![rec_id],
                        },
                    );
                }
            }
        }

        let alloc_result = (|| -> AmResult<(PageNum, Vec<u8>)> {
            let right_buf = pf.alloc_page(self.fd)?;
            let right_page = right_buf.page_num;
            let right_node = LeafNode {
                next_leaf_page: node.next_leaf_page,
                attr_length: node.attr_length,
                max_keys: node.max_keys,
                entries: right_entries,
            };
            right_node.encode(&mut right_buf.data)?;
            pf.unfix_page(self.fd, right_page, true)?;
            let separator = right_node.entries[0].key.clone();
            Ok((right_page, separator))
        })();
        let (right_page, separator) = match alloc_result {
            Ok(v) => v,
            Err(e) => {
                self.stack.clear();
                return Err(e);
            }
        };

        let left_node = LeafNode {
            next_leaf_page: right_page,
            attr_length: node.attr_length,
            max_keys: node.max_keys,
            entries: left_entries,
        };

        if leaf_page == self.root_page_num {
            let old_copy_result = (|| -> AmResult<PageNum> {
                let old_copy_buf = pf.alloc_page(self.fd)?;
                let old_copy_page = old_copy_buf.page_num;
                left_node.encode(&mut old_copy_buf.data)?;
                pf.unfix_page(self.fd, old_copy_page, true)?;
                Ok(old_copy_page)
            })();
            let old_copy_page = match old_copy_result {
                Ok(p) => p,
                Err(e) => {
                    self.stack.clear();
                    return Err(e);
                }
            };

            let root_result = (|| -> AmResult<()> {
                let root_buf = pf.get_this_page(self.fd, leaf_page)?;
                let int_node = IntNode {
                    attr_length: node.attr_length,
                    max_keys: node.max_keys,
                    keys: vec![separator],
                    children: vec![old_copy_page, right_page],
                };
                int_node.encode(&mut root_buf.data)?;
                pf.unfix_page(self.fd, leaf_page, true)?;
                Ok(())
            })();
            self.stack.clear();
            root_result
        } else {
            let write_result = (|| -> AmResult<()> {
                let buf = pf.get_this_page(self.fd, leaf_page)?;
                left_node.encode(&mut buf.data)?;
                pf.unfix_page(self.fd, leaf_page, true)?;
                Ok(())
            })();
            if let Err(e) = write_result {
                self.stack.clear();
                return Err(e);
            }
            self.add_to_parent(pf, right_page, &separator)
        }
    }

    /// Propagates a separator key for `child_page` up one level,
    /// splitting the parent internal node (and recursing further up) if
    /// it is full. `max_keys / 2` keys stay on the left, the remainder
    /// plus the floated-up middle key go right.
    fn add_to_parent(
        &mut self,
        pf: &mut PfManager,
        child_page: PageNum,
        value: &[u8],
    ) -> AmResult<()> {
        let Some((parent_page, child_idx)) = self.stack.pop() else {
            return Err(AmError::Internal("split propagated past the root"));
        };

        let decode_result = (|| -> AmResult<IntNode> {
            let buf = pf.get_this_page(self.fd, parent_page)?;
            let node = IntNode::decode(&buf.data)?;
            pf.unfix_page(self.fd, parent_page, false)?;
            Ok(node)
        })();
        let node = match decode_result {
            Ok(n) => n,
            Err(e) => {
                self.stack.clear();
                return Err(e);
            }
        };

        if (node.keys.len() as u16) < node.max_keys {
            let mut keys = node.keys;
            let mut children = node.children;
            keys.insert(child_idx, value.to_vec());
            children.insert(child_idx + 1, child_page);
            let write_result = (|| -> AmResult<()> {
                let buf = pf.get_this_page(self.fd, parent_page)?;
                IntNode {
                    attr_length: node.attr_length,
                    max_keys: node.max_keys,
                    keys,
                    children,
                }
                .encode(&mut buf.data)?;
                pf.unfix_page(self.fd, parent_page, true)?;
                Ok(())
            })();
            self.stack.clear();
            return write_result;
        }

        let mut keys = node.keys.clone();
        let mut children = node.children.clone();
        keys.insert(child_idx, value.to_vec());
        children.insert(child_idx + 1, child_page);

        let left_count = (node.max_keys / 2) as usize;
        let mid_key = keys[left_count].clone();
        let left_keys = keys[..left_count].to_vec();
        let left_children = children[..=left_count].to_vec();
        let right_keys = keys[left_count + 1..].to_vec();
        let right_children = children[left_count + 1..].to_vec();

        let right_alloc = (|| -> AmResult<PageNum> {
            let right_buf = pf.alloc_page(self.fd)?;
            let right_page = right_buf.page_num;
            IntNode {
                attr_length: node.attr_length,
                max_keys: node.max_keys,
                keys: right_keys,
                children: right_children,
            }
            .encode(&mut right_buf.data)?;
            pf.unfix_page(self.fd, right_page, true)?;
            Ok(right_page)
        })();
        let right_page = match right_alloc {
            Ok(p) => p,
            Err(e) => {
                self.stack.clear();
                return Err(e);
            }
        };

        let left_node = IntNode {
            attr_length: node.attr_length,
            max_keys: node.max_keys,
            keys: left_keys,
            children: left_children,
        };

        if parent_page == self.root_page_num {
            let old_copy_result = (|| -> AmResult<PageNum> {
                let old_copy_buf = pf.alloc_page(self.fd)?;
                let old_copy_page = old_copy_buf.page_num;
                left_node.encode(&mut old_copy_buf.data)?;
                pf.unfix_page(self.fd, old_copy_page, true)?;
                Ok(old_copy_page)
            })();
            let old_copy_page = match old_copy_result {
                Ok(p) => p,
                Err(e) => {
                    self.stack.clear();
                    return Err(e);
                }
            };

            let root_result = (|| -> AmResult<()> {
                let root_buf = pf.get_this_page(self.fd, parent_page)?;
                IntNode {
                    attr_length: node.attr_length,
                    max_keys: node.max_keys,
                    keys: vec![mid_key],
                    children: vec![old_copy_page, right_page],
                }
                .encode(&mut root_buf.data)?;
                pf.unfix_page(self.fd, parent_page, true)?;
                Ok(())
            })();
            self.stack.clear();
            root_result
        } else {
            let write_result = (|| -> AmResult<()> {
                let buf = pf.get_this_page(self.fd, parent_page)?;
                left_node.encode(&mut buf.data)?;
                pf.unfix_page(self.fd, parent_page, true)?;
                Ok(())
            })();
            if let Err(e) = write_result {
                self.stack.clear();
                return Err(e);
            }
            self.add_to_parent(pf, right_page, &mid_key)
        }
    }

    /// Removes one `(value, rec_id)` pairing. If that was the last
    /// rec-id under `value`, the key entry itself is dropped. There is
    /// no merge or rebalance on underflow (out of scope).
    pub fn delete(&mut self, pf: &mut PfManager, value: &[u8], rec_id: i32) -> AmResult<()> {
        self.validate_value(value)?;
        let (leaf_page, result) = self.search(pf, value)?;
        let idx = match result {
            SearchResult::Found(idx) => idx,
            SearchResult::NotFound(_) => {
                self.stack.clear();
                return Err(AmError::NotFound);
            }
        };

        let buf = pf.get_this_page(self.fd, leaf_page)?;
        let mut node = LeafNode::decode(&buf.data)?;
        pf.unfix_page(self.fd, leaf_page, false)?;

        let Some(pos) = node.entries[idx].rec_ids.iter().position(|&r| r == rec_id) else {
            self.stack.clear();
            return Err(AmError::NotFound);
        };
        node.entries[idx].rec_ids.remove(pos);
        if node.entries[idx].rec_ids.is_empty() {
            node.entries.remove(idx);
        }

        let buf = pf.get_this_page(self.fd, leaf_page)?;
        node.encode(&mut buf.data)?;
        pf.unfix_page(self.fd, leaf_page, true)?;
        self.stack.clear();
        Ok(())
    }

    /// Opens a scan over every `(key, rec_id)` pairing satisfying
    /// `key OP value`. `CompareOp::All` ignores `value`.
    pub fn open_scan(
        &mut self,
        pf: &mut PfManager,
        op: CompareOp,
        value: &[u8],
    ) -> AmResult<AmScan> {
        if self.open_scans >= self.max_scans {
            return Err(AmError::ScanTabFull);
        }
        if op != CompareOp::All {
            self.validate_value(value)?;
        }
        let start_page = self.leftmost_leaf(pf)?;
        self.open_scans += 1;
        Ok(AmScan {
            fd: self.fd,
            attr_type: self.attr_type,
            attr_length: self.attr_length,
            op,
            value: value.to_vec(),
            state: ScanState::First { page: start_page },
        })
    }

    /// Closes a scan opened on this index, freeing its slot in the
    /// bounded scan table.
    pub fn close_scan(&mut self, scan: AmScan) {
        drop(scan);
        self.open_scans = self.open_scans.saturating_sub(1);
    }
}

#[derive(Debug, Clone, Copy)]
enum ScanState {
    First { page: PageNum },
    Busy {
        page: PageNum,
        entry_idx: usize,
        rid_idx: usize,
    },
    Over,
}

/// An open scan over one index, walking leaves left to right via
/// `next_leaf_page` and filtering by a fixed comparison predicate.
pub struct AmScan {
    fd: i32,
    attr_type: AttrType,
    attr_length: usize,
    op: CompareOp,
    value: Vec<u8>,
    state: ScanState,
}

impl AmScan {
    /// Returns the next matching `(key, rec_id)` pairing, or
    /// `AmError::Eof` once the scan is exhausted.
    pub fn find_next(&mut self, pf: &mut PfManager) -> AmResult<(Vec<u8>, i32)> {
        loop {
            match self.state {
                ScanState::Over => return Err(AmError::Eof),
                ScanState::First { page } => {
                    self.state = ScanState::Busy {
                        page,
                        entry_idx: 0,
                        rid_idx: 0,
                    };
                }
                ScanState::Busy {
                    page,
                    entry_idx,
                    rid_idx,
                } => {
                    let buf = pf.get_this_page(self.fd, page)?;
                    let node = LeafNode::decode(&buf.data)?;
                    pf.unfix_page(self.fd, page, false)?;

                    if entry_idx >= node.entries.len() {
                        if node.next_leaf_page == common::NO_PAGE {
                            self.state = ScanState::Over;
                        } else {
                            self.state = ScanState::Busy {
                                page: node.next_leaf_page,
                                entry_idx: 0,
                                rid_idx: 0,
                            };
                        }
                        continue;
                    }

                    let entry = &node.entries[entry_idx];
                    if rid_idx >= entry.rec_ids.len() {
                        self.state = ScanState::Busy {
                            page,
                            entry_idx: entry_idx + 1,
                            rid_idx: 0,
                        };
                        continue;
                    }

                    let ord =
                        compare::compare(self.attr_type, self.attr_length, &entry.key, &self.value);
                    let rid = entry.rec_ids[rid_idx];
                    let key = entry.key.clone();
                    self.state = ScanState::Busy {
                        page,
                        entry_idx,
                        rid_idx: rid_idx + 1,
                    };

                    if matches_predicate(self.op, ord) {
                        return Ok((key, rid));
                    }
                }
            }
        }
    }
}
