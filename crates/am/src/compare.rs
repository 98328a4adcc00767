//! Attribute comparison for the three supported AM key types.
//!
//! Every value is copied into an aligned local before comparison (pages
//! are byte-addressed and never guaranteed to be scalar-aligned), mirroring
//! `AM_Compare`'s `memcpy`-into-locals approach.

use std::cmp::Ordering;

use common::AttrType;

/// Compares two encoded key byte strings of the given attribute type.
///
/// # Panics
/// Panics if either slice is shorter than `attr_length` for `Int`/`Float`,
/// or shorter than `attr_length` for `Char` — callers always hand this
/// function exactly `attr_length`-sized key slices.
pub fn compare(attr_type: AttrType, attr_length: usize, a: &[u8], b: &[u8]) -> Ordering {
    match attr_type {
        AttrType::Int => {
            let a = i32::from_le_bytes(a[..4].try_into().unwrap());
            let b = i32::from_le_bytes(b[..4].try_into().unwrap());
            a.cmp(&b)
        }
        AttrType::Float => {
            let a = f32::from_le_bytes(a[..4].try_into().unwrap());
            let b = f32::from_le_bytes(b[..4].try_into().unwrap());
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        AttrType::Char => a[..attr_length].cmp(&b[..attr_length]),
    }
}
