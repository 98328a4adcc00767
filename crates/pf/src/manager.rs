use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use common::{BufferStats, Config, PageNum, NO_PAGE};
use hashbrown::HashMap;

use crate::error::{PfError, PfResult};
use crate::page::{
    decode_frame, encode_frame, FileHeader, Page, CALLER_DATA_SIZE, FILE_HEADER_BYTES, PAGE_SIZE,
    USED,
};

/// Victim-selection policy used when every frame is full and a new page
/// needs a home. `Lru` evicts the least recently touched unpinned frame;
/// `Mru` evicts the most recently touched one. Mirrors `PF_SetStrategy`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Strategy {
    #[default]
    Lru,
    Mru,
}

struct OpenFile {
    path: PathBuf,
    file: File,
    header: FileHeader,
    hdr_changed: bool,
}

struct FrameSlot {
    fd: i32,
    page_num: PageNum,
    next_free_marker: i32,
    pinned: bool,
    dirty: bool,
    occupied: bool,
    page: Page,
}

impl FrameSlot {
    fn fresh(fd: i32, page_num: PageNum) -> Self {
        Self {
            fd,
            page_num,
            next_free_marker: USED,
            pinned: false,
            dirty: false,
            occupied: true,
            page: Page::new(page_num),
        }
    }
}

/// The buffer-pool-and-file-table half of the paged-file layer. Owns every
/// open file and every resident page frame; there is no process-global
/// state the way the original C library kept one, so a program that wants
/// two independent paged-file worlds just makes two `PfManager`s.
pub struct PfManager {
    config: Config,
    files: Vec<Option<OpenFile>>,
    frames: Vec<FrameSlot>,
    recency: Vec<usize>,
    index: HashMap<(i32, PageNum), usize>,
    strategy: Strategy,
    stats: BufferStats,
}

impl PfManager {
    pub fn new(config: Config) -> Self {
        Self {
            files: Vec::with_capacity(config.file_table_size),
            frames: Vec::with_capacity(config.max_bufs),
            recency: Vec::with_capacity(config.max_bufs),
            index: HashMap::with_capacity(config.hash_buckets),
            strategy: Strategy::default(),
            stats: BufferStats::default(),
            config,
        }
    }

    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.strategy = strategy;
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    pub fn stats(&self) -> BufferStats {
        self.stats
    }

    pub fn create_file(&self, path: impl AsRef<Path>) -> PfResult<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path.as_ref())?;
        let header = FileHeader {
            first_free: NO_PAGE,
            num_pages: 0,
        };
        file.write_all(&header.encode()?)?;
        Ok(())
    }

    pub fn destroy_file(&self, path: impl AsRef<Path>) -> PfResult<()> {
        let path = path.as_ref();
        if self.files.iter().flatten().any(|f| f.path == path) {
            return Err(PfError::FileOpen);
        }
        std::fs::remove_file(path)?;
        Ok(())
    }

    pub fn open_file(&mut self, path: impl AsRef<Path>) -> PfResult<i32> {
        let path = path.as_ref().to_path_buf();
        let fd = match self.files.iter().position(|s| s.is_none()) {
            Some(i) => i,
            None if self.files.len() < self.config.file_table_size => {
                self.files.push(None);
                self.files.len() - 1
            }
            None => return Err(PfError::FtabFull),
        };
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
        let mut hdr_buf = [0u8; FILE_HEADER_BYTES];
        file.read_exact(&mut hdr_buf)?;
        let header = FileHeader::decode(&hdr_buf)?;
        self.files[fd] = Some(OpenFile {
            path,
            file,
            header,
            hdr_changed: false,
        });
        Ok(fd as i32)
    }

    pub fn close_file(&mut self, fd: i32) -> PfResult<()> {
        self.validate_fd(fd)?;
        if let Some((&(f, p), _)) = self
            .index
            .iter()
            .find(|(&(f, _), &idx)| f == fd && self.frames[idx].pinned)
        {
            return Err(PfError::PageFixed(f, p));
        }
        let keys: Vec<(i32, PageNum)> = self
            .index
            .keys()
            .filter(|&&(f, _)| f == fd)
            .copied()
            .collect();
        for key in keys {
            let idx = self.index.remove(&key).unwrap();
            if self.frames[idx].dirty {
                self.flush_frame(fd, idx)?;
            }
            self.recency.retain(|&i| i != idx);
            self.frames[idx].occupied = false;
        }
        let of = self.files[fd as usize].as_mut().unwrap();
        if of.hdr_changed {
            of.file.seek(SeekFrom::Start(0))?;
            of.file.write_all(&of.header.encode()?)?;
            of.hdr_changed = false;
        }
        self.files[fd as usize] = None;
        Ok(())
    }

    pub fn get_first_page(&mut self, fd: i32) -> PfResult<&mut Page> {
        self.scan_from(fd, 0)
    }

    pub fn get_next_page(&mut self, fd: i32, current: PageNum) -> PfResult<&mut Page> {
        self.scan_from(fd, current + 1)
    }

    pub fn get_this_page(&mut self, fd: i32, page_num: PageNum) -> PfResult<&mut Page> {
        self.validate_fd(fd)?;
        self.validate_page_num(fd, page_num)?;
        let idx = self.fetch_existing(fd, page_num)?;
        if self.frames[idx].next_free_marker != USED {
            self.frames[idx].pinned = false;
            return Err(PfError::InvalidPage(fd, page_num));
        }
        Ok(&mut self.frames[idx].page)
    }

    pub fn alloc_page(&mut self, fd: i32) -> PfResult<&mut Page> {
        self.validate_fd(fd)?;
        let page_num = self.allocate_page_num(fd)?;
        let idx = self.acquire_frame_slot(fd, page_num)?;
        self.frames[idx] = FrameSlot::fresh(fd, page_num);
        self.frames[idx].pinned = true;
        self.frames[idx].dirty = true;
        self.index.insert((fd, page_num), idx);
        self.note_access(idx);
        Ok(&mut self.frames[idx].page)
    }

    pub fn dispose_page(&mut self, fd: i32, page_num: PageNum) -> PfResult<()> {
        self.validate_fd(fd)?;
        self.validate_page_num(fd, page_num)?;

        let marker = match self.index.get(&(fd, page_num)) {
            Some(&idx) => self.frames[idx].next_free_marker,
            None => self.read_next_free_marker_from_disk(fd, page_num)?,
        };
        if marker != USED {
            return Err(PfError::PageFree(fd, page_num));
        }

        if let Some(&idx) = self.index.get(&(fd, page_num)) {
            if self.frames[idx].pinned {
                return Err(PfError::PageFixed(fd, page_num));
            }
            self.index.remove(&(fd, page_num));
            self.recency.retain(|&i| i != idx);
            self.frames[idx].occupied = false;
        }
        let old_first_free = self.files[fd as usize].as_ref().unwrap().header.first_free;
        self.write_next_free_marker(fd, page_num, old_first_free)?;
        let of = self.files[fd as usize].as_mut().unwrap();
        of.header.first_free = page_num;
        of.hdr_changed = true;
        Ok(())
    }

    pub fn unfix_page(&mut self, fd: i32, page_num: PageNum, mark_dirty: bool) -> PfResult<()> {
        self.validate_fd(fd)?;
        match self.index.get(&(fd, page_num)) {
            // A miss here means the page isn't resident at all: per the
            // original PF_UnfixPage contract this is a no-op success, not
            // an error, so callers never have to track residency just to
            // unwind cleanly on an error path.
            None => Ok(()),
            Some(&idx) => {
                if !self.frames[idx].pinned {
                    return Err(PfError::PageUnfixed(fd, page_num));
                }
                self.frames[idx].pinned = false;
                self.frames[idx].dirty |= mark_dirty;
                Ok(())
            }
        }
    }

    fn scan_from(&mut self, fd: i32, mut page_num: PageNum) -> PfResult<&mut Page> {
        self.validate_fd(fd)?;
        loop {
            let num_pages = self.files[fd as usize].as_ref().unwrap().header.num_pages;
            if page_num >= num_pages {
                return Err(PfError::Eof);
            }
            let idx = self.fetch_existing(fd, page_num)?;
            if self.frames[idx].next_free_marker == USED {
                return Ok(&mut self.frames[idx].page);
            }
            self.frames[idx].pinned = false;
            page_num += 1;
        }
    }

    fn fetch_existing(&mut self, fd: i32, page_num: PageNum) -> PfResult<usize> {
        if let Some(&idx) = self.index.get(&(fd, page_num)) {
            if self.frames[idx].pinned {
                return Err(PfError::PageFixed(fd, page_num));
            }
            self.frames[idx].pinned = true;
            self.stats.logical_reads += 1;
            self.note_access(idx);
            return Ok(idx);
        }
        let idx = self.acquire_frame_slot(fd, page_num)?;
        let offset = FILE_HEADER_BYTES as u64 + (page_num as u64) * PAGE_SIZE as u64;
        let file = &mut self.files[fd as usize].as_mut().unwrap().file;
        file.seek(SeekFrom::Start(offset))?;
        let mut raw = vec![0u8; PAGE_SIZE];
        file.read_exact(&mut raw)
            .map_err(|_| PfError::IncompleteRead)?;
        let (next_free, data) = decode_frame(&raw)?;
        self.frames[idx] = FrameSlot::fresh(fd, page_num);
        self.frames[idx].next_free_marker = next_free;
        self.frames[idx].page.data = data;
        self.frames[idx].pinned = true;
        self.stats.physical_reads += 1;
        self.stats.logical_reads += 1;
        self.index.insert((fd, page_num), idx);
        self.note_access(idx);
        Ok(idx)
    }

    fn acquire_frame_slot(&mut self, fd: i32, page_num: PageNum) -> PfResult<usize> {
        // A slot left behind by `close_file` is unoccupied but still sitting
        // in `self.frames`; reclaim it before growing or evicting, or every
        // closed file's frames would be stranded forever and the pool's
        // effective capacity would shrink each time a file is closed.
        if let Some(idx) = self.frames.iter().position(|f| !f.occupied) {
            self.frames[idx] = FrameSlot::fresh(fd, page_num);
            return Ok(idx);
        }
        if self.frames.len() < self.config.max_bufs {
            self.frames.push(FrameSlot::fresh(fd, page_num));
            return Ok(self.frames.len() - 1);
        }
        let victim = self.select_victim()?;
        if self.frames[victim].occupied {
            let victim_fd = self.frames[victim].fd;
            let victim_page = self.frames[victim].page_num;
            if self.frames[victim].dirty {
                self.flush_frame(victim_fd, victim)?;
            }
            self.index.remove(&(victim_fd, victim_page));
        }
        self.recency.retain(|&i| i != victim);
        self.frames[victim] = FrameSlot::fresh(fd, page_num);
        Ok(victim)
    }

    fn select_victim(&self) -> PfResult<usize> {
        let found = match self.strategy {
            Strategy::Lru => self.recency.iter().rev().find(|&&i| !self.frames[i].pinned),
            Strategy::Mru => self.recency.iter().find(|&&i| !self.frames[i].pinned),
        };
        found.copied().ok_or(PfError::NoBuf(self.config.max_bufs))
    }

    fn note_access(&mut self, idx: usize) {
        self.recency.retain(|&i| i != idx);
        self.recency.insert(0, idx);
    }

    fn flush_frame(&mut self, fd: i32, idx: usize) -> PfResult<()> {
        let page_num = self.frames[idx].page_num;
        let next_free = self.frames[idx].next_free_marker;
        let raw = encode_frame(next_free, &self.frames[idx].page.data)?;
        let offset = FILE_HEADER_BYTES as u64 + (page_num as u64) * PAGE_SIZE as u64;
        let file = &mut self.files[fd as usize].as_mut().unwrap().file;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&raw)?;
        self.stats.physical_writes += 1;
        self.frames[idx].dirty = false;
        Ok(())
    }

    fn allocate_page_num(&mut self, fd: i32) -> PfResult<PageNum> {
        let first_free = self.files[fd as usize].as_ref().unwrap().header.first_free;
        if first_free == NO_PAGE {
            let of = self.files[fd as usize].as_mut().unwrap();
            let new_page = of.header.num_pages;
            of.header.num_pages += 1;
            of.hdr_changed = true;
            Ok(new_page)
        } else {
            let next_link = self.read_next_free_marker_from_disk(fd, first_free)?;
            let of = self.files[fd as usize].as_mut().unwrap();
            of.header.first_free = next_link;
            of.hdr_changed = true;
            Ok(first_free)
        }
    }

    fn read_next_free_marker_from_disk(&mut self, fd: i32, page_num: PageNum) -> PfResult<i32> {
        let offset = FILE_HEADER_BYTES as u64 + (page_num as u64) * PAGE_SIZE as u64;
        let file = &mut self.files[fd as usize].as_mut().unwrap().file;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = [0u8; 4];
        file.read_exact(&mut buf)
            .map_err(|_| PfError::IncompleteRead)?;
        let (marker, _) = bincode::serde::decode_from_slice(&buf, bincode::config::legacy())
            .map_err(|_| PfError::IncompleteRead)?;
        Ok(marker)
    }

    fn write_next_free_marker(&mut self, fd: i32, page_num: PageNum, marker: i32) -> PfResult<()> {
        let offset = FILE_HEADER_BYTES as u64 + (page_num as u64) * PAGE_SIZE as u64;
        let mut buf = [0u8; 4];
        bincode::serde::encode_into_slice(marker, &mut buf, bincode::config::legacy())
            .map_err(|_| PfError::IncompleteWrite)?;
        let file = &mut self.files[fd as usize].as_mut().unwrap().file;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&buf)?;
        self.stats.physical_writes += 1;
        Ok(())
    }

    fn validate_fd(&self, fd: i32) -> PfResult<()> {
        if fd < 0 || (fd as usize) >= self.files.len() || self.files[fd as usize].is_none() {
            return Err(PfError::InvalidFd(fd));
        }
        Ok(())
    }

    fn validate_page_num(&self, fd: i32, page_num: PageNum) -> PfResult<()> {
        let num_pages = self.files[fd as usize].as_ref().unwrap().header.num_pages;
        if page_num < 0 || page_num >= num_pages {
            return Err(PfError::InvalidPage(fd, page_num));
        }
        Ok(())
    }
}

#[allow(dead_code)]
const _ASSERT_CALLER_DATA_SIZE: usize = CALLER_DATA_SIZE;
