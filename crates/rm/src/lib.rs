//! Record-manager layer: variable-length records addressable by a stable
//! `(page, slot)` [`Rid`], laid out as slotted pages on top of [`pf`].
//!
//! `RecordFile` never touches a file descriptor directly — every page it
//! reads or writes goes through a caller-supplied [`PfManager`], the same
//! "pass the buffer pool in explicitly" design `pf` itself uses instead of
//! a process-global singleton.
//!
//! # Example
//!
//! ```no_run
//! use common::Config;
//! use pf::PfManager;
//! use rm::RecordFile;
//!
//! let mut pf = PfManager::new(Config::default());
//! RecordFile::create(&pf, "students.db").unwrap();
//! let mut rm = RecordFile::open(&mut pf, "students.db").unwrap();
//! let rid = rm.insert_rec(&mut pf, b"Ada Lovelace").unwrap();
//! let data = rm.get_rec(&mut pf, rid).unwrap();
//! assert_eq!(data, b"Ada Lovelace");
//! ```

mod error;
mod page;


use std::path::Path;

use common::{Rid, NO_PAGE};
use pf::PfManager;

pub use error::{RmError, RmResult};

/// Space-usage report produced by [`RecordFile::get_space_utilization`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpaceUtilization {
    pub total_pages: i64,
    pub total_record_bytes: i64,
    pub total_wasted_bytes: i64,
}

/// A file managed by the record layer. Thin wrapper over a PF file
/// descriptor; all page access goes through the `PfManager` passed to
/// every method.
#[derive(Debug, Clone, Copy)]
pub struct RecordFile {
    fd: i32,
}

impl RecordFile {
    pub fn create(pf: &PfManager, path: impl AsRef<Path>) -> RmResult<()> {
        pf.create_file(path)?;
        Ok(())
    }

    pub fn destroy(pf: &PfManager, path: impl AsRef<Path>) -> RmResult<()> {
        pf.destroy_file(path)?;
        Ok(())
    }

    pub fn open(pf: &mut PfManager, path: impl AsRef<Path>) -> RmResult<Self> {
        let fd = pf.open_file(path)?;
        Ok(Self { fd })
    }

    pub fn close(self, pf: &mut PfManager) -> RmResult<()> {
        pf.close_file(self.fd)?;
        Ok(())
    }

    pub fn fd(&self) -> i32 {
        self.fd
    }

    /// Inserts `data` as a new record, scanning existing pages for one
    /// with enough free space before allocating a fresh page. Returns the
    /// `Rid` the record can be retrieved and deleted by.
    pub fn insert_rec(&mut self, pf: &mut PfManager, data: &[u8]) -> RmResult<Rid> {
        let page_num = self.find_free_page(pf, data.len())?;
        let buf = pf.get_this_page(self.fd, page_num)?;
        let mut header = page::PageHeader::decode(&buf.data)?;

        let new_free_offset = header.free_space_offset - data.len() as i32;
        buf.data[new_free_offset as usize..header.free_space_offset as usize]
            .copy_from_slice(data);

        let slot_idx = header.num_slots;
        page::write_slot(
            &mut buf.data,
            slot_idx,
            page::Slot {
                offset: new_free_offset,
                length: data.len() as i32,
            },
        )?;
        header.num_slots += 1;
        header.free_space_offset = new_free_offset;
        header.encode(&mut buf.data)?;

        pf.unfix_page(self.fd, page_num, true)?;
        Ok(Rid::new(page_num, slot_idx))
    }

    /// Marks a record's slot as tombstoned. Fails if the slot is already
    /// tombstoned; the slot itself (and its historical `length`) is never
    /// reclaimed — there is no page compaction.
    pub fn delete_rec(&mut self, pf: &mut PfManager, rid: Rid) -> RmResult<()> {
        let buf = pf.get_this_page(self.fd, rid.page_num)?;
        let header = page::PageHeader::decode(&buf.data)?;
        if rid.slot_num < 0 || rid.slot_num >= header.num_slots {
            pf.unfix_page(self.fd, rid.page_num, false)?;
            return Err(RmError::InvalidRid(rid));
        }
        let slot = page::read_slot(&buf.data, rid.slot_num)?;
        if slot.is_tombstone() {
            pf.unfix_page(self.fd, rid.page_num, false)?;
            return Err(RmError::RecordDeleted(rid));
        }
        page::write_slot(
            &mut buf.data,
            rid.slot_num,
            page::Slot {
                offset: page::TOMBSTONE_OFFSET,
                length: slot.length,
            },
        )?;
        pf.unfix_page(self.fd, rid.page_num, true)?;
        Ok(())
    }

    /// Retrieves a live record's bytes. Fails if the slot is out of range
    /// or tombstoned.
    pub fn get_rec(&mut self, pf: &mut PfManager, rid: Rid) -> RmResult<Vec<u8>> {
        let buf = pf.get_this_page(self.fd, rid.page_num)?;
        let header = page::PageHeader::decode(&buf.data)?;
        if rid.slot_num < 0 || rid.slot_num >= header.num_slots {
            pf.unfix_page(self.fd, rid.page_num, false)?;
            return Err(RmError::InvalidRid(rid));
        }
        let slot = page::read_slot(&buf.data, rid.slot_num)?;
        if slot.is_tombstone() {
            pf.unfix_page(self.fd, rid.page_num, false)?;
            return Err(RmError::RecordDeleted(rid));
        }
        let start = slot.offset as usize;
        let end = start + slot.length as usize;
        let out = buf.data[start..end].to_vec();
        pf.unfix_page(self.fd, rid.page_num, false)?;
        Ok(out)
    }

    pub fn scan_open(&self) -> RmScan {
        RmScan {
            fd: self.fd,
            current_page: NO_PAGE,
            current_slot: 0,
        }
    }

    /// Scans every used page, summing live-record bytes. Wasted bytes are
    /// `page_size - record_bytes` per page (header, slot directory, holes
    /// from tombstoned slots, and untouched free space all count as
    /// waste), matching `RM_GetSpaceUtilization`.
    pub fn get_space_utilization(&mut self, pf: &mut PfManager) -> RmResult<SpaceUtilization> {
        let mut report = SpaceUtilization::default();
        let mut page_num = NO_PAGE;
        loop {
            let buf = match pf.get_next_page(self.fd, page_num) {
                Ok(buf) => buf,
                Err(pf::PfError::Eof) => break,
                Err(e) => return Err(e.into()),
            };
            page_num = buf.page_num;
            let header = page::PageHeader::decode(&buf.data)?;
            let page_size = buf.data.len() as i64;
            let mut used_bytes = 0i64;
            for idx in 0..header.num_slots {
                let slot = page::read_slot(&buf.data, idx)?;
                if !slot.is_tombstone() {
                    used_bytes += slot.length as i64;
                }
            }
            report.total_pages += 1;
            report.total_record_bytes += used_bytes;
            report.total_wasted_bytes += page_size - used_bytes;
            pf.unfix_page(self.fd, page_num, false)?;
        }
        Ok(report)
    }

    /// Scans pages looking for one with room for a record of `data_len`
    /// bytes plus a new slot; allocates and initializes a fresh page if
    /// none is found. Unfixes every page it visits on every exit path.
    fn find_free_page(&mut self, pf: &mut PfManager, data_len: usize) -> RmResult<common::PageNum> {
        let required = data_len as i32 + page::SLOT_BYTES as i32;
        let mut page_num = NO_PAGE;
        loop {
            let buf = match pf.get_next_page(self.fd, page_num) {
                Ok(buf) => buf,
                Err(pf::PfError::Eof) => break,
                Err(e) => return Err(e.into()),
            };
            page_num = buf.page_num;
            let header = page::PageHeader::decode(&buf.data)?;
            let free = page::free_space(header);
            pf.unfix_page(self.fd, page_num, false)?;
            if free >= required {
                return Ok(page_num);
            }
        }
        let buf = pf.alloc_page(self.fd)?;
        let new_page = buf.page_num;
        page::init_page(&mut buf.data)?;
        pf.unfix_page(self.fd, new_page, true)?;
        Ok(new_page)
    }
}

/// Iterates live records in page-then-slot order.
#[derive(Debug, Clone, Copy)]
pub struct RmScan {
    fd: i32,
    current_page: common::PageNum,
    current_slot: i32,
}

impl RmScan {
    /// Returns the next live `(rid, data)` pair, or `RmError::Eof` once
    /// every page has been exhausted.
    pub fn next(&mut self, pf: &mut PfManager) -> RmResult<(Rid, Vec<u8>)> {
        loop {
            let buf = if self.current_page == NO_PAGE {
                match pf.get_next_page(self.fd, NO_PAGE) {
                    Ok(buf) => {
                        self.current_page = buf.page_num;
                        self.current_slot = 0;
                        buf
                    }
                    Err(pf::PfError::Eof) => return Err(RmError::Eof),
                    Err(e) => return Err(e.into()),
                }
            } else {
                pf.get_this_page(self.fd, self.current_page)?
            };

            let header = page::PageHeader::decode(&buf.data)?;
            while self.current_slot < header.num_slots {
                let slot = page::read_slot(&buf.data, self.current_slot)?;
                if !slot.is_tombstone() {
                    let start = slot.offset as usize;
                    let end = start + slot.length as usize;
                    let data = buf.data[start..end].to_vec();
                    let rid = Rid::new(self.current_page, self.current_slot);
                    self.current_slot += 1;
                    pf.unfix_page(self.fd, self.current_page, false)?;
                    return Ok((rid, data));
                }
                self.current_slot += 1;
            }

            let finished_page = self.current_page;
            pf.unfix_page(self.fd, finished_page, false)?;
            match pf.get_next_page(self.fd, finished_page) {
                Ok(buf) => {
                    self.current_page = buf.page_num;
                    self.current_slot = 0;
                    pf.unfix_page(self.fd, self.current_page, false)?;
                }
                Err(pf::PfError::Eof) => return Err(RmError::Eof),
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn close(self) {}
}
