//! Paged-file layer: a pinning buffer pool over fixed-size disk pages.
//!
//! Every other layer in this workspace (`rm`'s slotted pages, `am`'s
//! B+-tree nodes) allocates and reads pages through a [`PfManager`]
//! instead of touching files directly. The pool hands out pages pinned —
//! a page is never silently paged out from under a caller still using
//! it — and tracks dirtiness so eviction only writes back pages that
//! actually changed.
//!
//! # Example
//!
//! ```no_run
//! use common::Config;
//! use pf::PfManager;
//!
//! let mut pf = PfManager::new(Config::default());
//! pf.create_file("table.db").unwrap();
//! let fd = pf.open_file("table.db").unwrap();
//! let page_num = {
//!     let page = pf.alloc_page(fd).unwrap();
//!     page.page_num
//! };
//! pf.unfix_page(fd, page_num, true).unwrap();
//! pf.close_file(fd).unwrap();
//! ```

mod error;
mod manager;
mod page;

#[cfg(test)]
mod tests;

pub use error::{PfError, PfResult};
pub use manager::{PfManager, Strategy};
pub use page::{Page, CALLER_DATA_SIZE, LIST_END, PAGE_SIZE, USED};
