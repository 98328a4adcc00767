//! Binary search over leaf and internal node key arrays.

use std::cmp::Ordering;

use common::AttrType;

use crate::compare::compare;
use crate::node::{IntNode, LeafNode};

/// Result of searching a leaf for a key: a 0-based position into
/// `entries`, either where the key already lives or where it should be
/// inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SearchResult {
    Found(usize),
    NotFound(usize),
}

/// Binary-searches a leaf's sorted keys. Ties are exact matches.
pub(crate) fn search_leaf(node: &LeafNode, attr_type: AttrType, value: &[u8]) -> SearchResult {
    if node.entries.is_empty() {
        return SearchResult::NotFound(0);
    }
    let mut low = 0i64;
    let mut high = node.entries.len() as i64 - 1;
    while low <= high {
        let mid = ((low + high) / 2) as usize;
        match compare(attr_type, node.attr_length, &node.entries[mid].key, value) {
            Ordering::Equal => return SearchResult::Found(mid),
            Ordering::Less => low = mid as i64 + 1,
            Ordering::Greater => high = mid as i64 - 1,
        }
    }
    SearchResult::NotFound(low as usize)
}

/// Binary-searches an internal node's separator keys. An exact match
/// routes into `children[mid + 1]` (ties route right), matching
/// `AM_BinSearch`. Returns the child index followed and that child's
/// page number.
pub(crate) fn search_internal(
    node: &IntNode,
    attr_type: AttrType,
    value: &[u8],
) -> (usize, common::PageNum) {
    let mut low = 0i64;
    let mut high = node.keys.len() as i64 - 1;
    while low <= high {
        let mid = ((low + high) / 2) as usize;
        match compare(attr_type, node.attr_length, &node.keys[mid], value) {
            Ordering::Equal => return (mid + 1, node.children[mid + 1]),
            Ordering::Less => low = mid as i64 + 1,
            Ordering::Greater => high = mid as i64 - 1,
        }
    }
    (low as usize, node.children[low as usize])
}

/// Evaluates a scan predicate given `key OP value`'s ordering (`ord =
/// compare(key, value)`; `Less` means `key < value`).
pub(crate) fn matches_predicate(op: common::CompareOp, ord: Ordering) -> bool {
    use common::CompareOp::*;
    match op {
        All => true,
        Eq => ord == Ordering::Equal,
        Lt => ord == Ordering::Less,
        Gt => ord == Ordering::Greater,
        Le => ord != Ordering::Greater,
        Ge => ord != Ordering::Less,
        Ne => ord != Ordering::Equal,
    }
}
