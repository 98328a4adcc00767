//! Shared identifiers, attribute types, and configuration used by every
//! layer of the storage stack (`pf`, `rm`, `am`).


use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Page number within a paged file. Negative values are reserved for
/// sentinels (`NO_PAGE`, free-list terminators); valid page numbers are
/// always `>= 0`.
///
/// Examples:
/// - `let root: PageNum = 0;`
/// - `let overflow: PageNum = 4021;`
pub type PageNum = i32;

/// Sentinel meaning "no page" — used as the initial `pagenum` cursor for
/// `PF_GetFirstPage`-style iteration and as the free-list terminator.
pub const NO_PAGE: PageNum = -1;

/// Record identifier: a page number paired with a slot index within that
/// page's slot directory.
///
/// Examples:
/// - `let rid = Rid::new(0, 3);`
/// - `let rid = Rid::new(42, 0);`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rid {
    pub page_num: PageNum,
    pub slot_num: i32,
}

impl Rid {
    pub fn new(page_num: PageNum, slot_num: i32) -> Self {
        Self { page_num, slot_num }
    }

    /// Packs this RID into the single 32-bit integer convention AM indexes
    /// store as an opaque value: `(page_num << 16) | (slot_num & 0xFFFF)`.
    pub fn pack(self) -> i32 {
        (self.page_num << 16) | (self.slot_num & 0xFFFF)
    }

    /// Unpacks a 32-bit integer produced by [`Rid::pack`] back into a `Rid`.
    pub fn unpack(packed: i32) -> Self {
        Self {
            page_num: packed >> 16,
            slot_num: (packed << 16) >> 16,
        }
    }
}

impl std::fmt::Display for Rid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.page_num, self.slot_num)
    }
}

/// The three attribute types an AM index can be built over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrType {
    Int,
    Float,
    Char,
}

impl AttrType {
    /// The one-character tag used in index file naming conventions and
    /// diagnostics, matching the original `'i' | 'f' | 'c'` convention.
    pub fn as_char(self) -> char {
        match self {
            AttrType::Int => 'i',
            AttrType::Float => 'f',
            AttrType::Char => 'c',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'i' => Some(AttrType::Int),
            'f' => Some(AttrType::Float),
            'c' => Some(AttrType::Char),
            _ => None,
        }
    }

    /// `int` and `float` attributes are always 4 bytes; `char` attributes
    /// may be any length in `[1, MAX_ATTR_LENGTH]`.
    pub fn is_valid_length(self, attr_length: i32) -> bool {
        match self {
            AttrType::Int | AttrType::Float => attr_length == 4,
            AttrType::Char => (1..=MAX_ATTR_LENGTH as i32).contains(&attr_length),
        }
    }
}

/// Comparison predicate accepted by an AM scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    All,
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
    Ne,
}

/// Largest attribute length (in bytes) an AM index will accept for a `char`
/// attribute.
pub const MAX_ATTR_LENGTH: usize = 256;

/// Page-access counters maintained by the buffer pool. This is the only
/// observability surface this system exposes: no logging facade sits above
/// it, so callers that want visibility into buffer behavior read these
/// counters directly, the same way the harness does to compare bulk-load
/// against one-by-one insertion.
///
/// Examples:
/// - `let mut stats = BufferStats::default(); stats.logical_reads += 1;`
/// - `stats.reset();`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferStats {
    pub logical_reads: u64,
    pub physical_reads: u64,
    pub physical_writes: u64,
}

impl BufferStats {
    pub fn reset(&mut self) {
        *self = BufferStats::default();
    }
}

/// Runtime configuration for the storage stack.
///
/// # Example
/// ```
/// use common::Config;
///
/// let config = Config::builder()
///     .max_bufs(40)
///     .max_attr_length(256)
///     .build();
/// assert_eq!(config.page_size, 4096);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, bon::Builder)]
pub struct Config {
    /// Directory where paged files and index files live.
    #[builder(default = PathBuf::from("./db_data"))]
    pub data_dir: PathBuf,
    /// Fixed-size page allocation in bytes. This is a compile-time constant
    /// in `pf::PAGE_SIZE`; the config field exists for diagnostics and to
    /// document the value rather than to make it runtime-configurable —
    /// there is no support for variable page sizes.
    #[builder(default = 4096)]
    pub page_size: usize,
    /// Maximum number of frames the buffer pool keeps resident at once.
    #[builder(default = 40)]
    pub max_bufs: usize,
    /// Maximum number of simultaneously open file-table slots.
    #[builder(default = 20)]
    pub file_table_size: usize,
    /// Number of buckets in the buffer pool's (fd, page) hash index.
    #[builder(default = 211)]
    pub hash_buckets: usize,
    /// Largest `char` attribute length an AM index accepts.
    #[builder(default = MAX_ATTR_LENGTH)]
    pub max_attr_length: usize,
    /// Maximum number of concurrently open AM scans.
    #[builder(default = 20)]
    pub max_scans: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./db_data"),
            page_size: 4096,
            max_bufs: 40,
            file_table_size: 20,
            hash_buckets: 211,
            max_attr_length: MAX_ATTR_LENGTH,
            max_scans: 20,
        }
    }
}
