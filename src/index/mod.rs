//! Disk-backed positional index.
//!
//! The index is a flat array of 64-bit little-endian offsets into a value
//! file, one entry per logical record. It exists to give a binary search
//! something cheap to seek over when record data itself is variable in
//! cost to reach. Entries are read and written in whole pages through an
//! MQ page cache; pages pushed out of the cache are written back to disk
//! by the eviction handler.
//!
//! The page size is a tuning constant, not a format constant. Readers
//! using a different page size observe the same entries.

mod position;

pub use position::{EntryPosition, ENTRY_SIZE};

use crate::cache::{CacheStats, MqCache};
use crate::config::Options;
use crate::error::{Error, Result};
use bytes::{Buf, BufMut, BytesMut};
use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Size of one index page in bytes.
pub const PAGE_SIZE: usize = 8192;

/// Number of 64-bit entries held by one page.
pub const ENTRIES_PER_PAGE: usize = PAGE_SIZE / ENTRY_SIZE as usize;

/// A cached page: the decoded entries of one page-aligned file region.
/// Shared between the cache, the lookup paths, and the write-back handler.
type Page = Rc<RefCell<Vec<u64>>>;

/// Disk-backed array of 64-bit entry offsets with page-granular caching.
///
/// All reads and writes go through the page cache. A write marks nothing
/// explicitly; eviction writes the whole page back unconditionally, so
/// eviction time is the durability point. [`flush`](PositionalIndex::flush)
/// forces every cached page to disk, and dropping the index flushes as a
/// best effort.
pub struct PositionalIndex {
    file: Rc<RefCell<File>>,
    path: PathBuf,
    entry_count: u64,
    cache: MqCache<u64, Page>,
}

impl PositionalIndex {
    /// Open an index file, creating it if it does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_options(path, &Options::default())
    }

    /// Open an index file with explicit cache options.
    pub fn with_options<P: AsRef<Path>>(path: P, options: &Options) -> Result<Self> {
        options.validate()?;

        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let entry_count = file.metadata()?.len() / ENTRY_SIZE;
        let file = Rc::new(RefCell::new(file));

        let mut cache = MqCache::with_params(
            options.cache_capacity,
            options.cache_life_time,
            options.cache_queue_count,
        );
        let writeback = Rc::clone(&file);
        cache.set_on_evict(Box::new(move |page_base: u64, page: Page| {
            write_page(&mut writeback.borrow_mut(), page_base, &page.borrow())
        }));

        log::debug!("opened index {:?} with {} entries", path, entry_count);

        Ok(Self { file, path, entry_count, cache })
    }

    /// Whether the index file handle is held. Open failures are reported
    /// by [`open`](PositionalIndex::open) itself.
    pub fn is_open(&self) -> bool {
        true
    }

    /// Number of entries covered by the index file at open, extended by
    /// writes past the end.
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Read the offset stored for `entry`.
    ///
    /// Entries beyond the end of the file read as zero.
    pub fn get_entry_offset(&mut self, entry: EntryPosition) -> Result<u64> {
        let pos = entry.byte_offset();
        let page_base = page_base_of(pos);
        let slot = ((pos - page_base) / ENTRY_SIZE) as usize;

        let page = self.page(page_base)?;
        let value = page.borrow()[slot];
        Ok(value)
    }

    /// Store `offset` for `entry`.
    ///
    /// The page becomes dirty in the cache and reaches disk when it is
    /// evicted, flushed, or the index is dropped.
    pub fn put_entry_offset(&mut self, entry: EntryPosition, offset: u64) -> Result<()> {
        let pos = entry.byte_offset();
        let page_base = page_base_of(pos);
        let slot = ((pos - page_base) / ENTRY_SIZE) as usize;
        if slot >= ENTRIES_PER_PAGE {
            return Err(Error::invalid_argument(format!(
                "entry slot {} outside page of {} entries",
                slot, ENTRIES_PER_PAGE
            )));
        }

        let page = self.page(page_base)?;
        page.borrow_mut()[slot] = offset;

        if entry.ordinal() >= self.entry_count {
            self.entry_count = entry.ordinal() + 1;
        }
        Ok(())
    }

    /// Write every cached page back to disk without evicting it.
    pub fn flush(&mut self) -> Result<()> {
        let mut file = self.file.borrow_mut();
        for (page_base, page) in self.cache.iter() {
            write_page(&mut file, *page_base, &page.borrow())?;
        }
        Ok(())
    }

    /// Statistics of the underlying page cache.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Fetch the page starting at `page_base`, reading it from disk on a
    /// cache miss. Installing the page may evict another, which writes
    /// that page back.
    fn page(&mut self, page_base: u64) -> Result<Page> {
        if let Some(page) = self.cache.get(&page_base) {
            return Ok(page);
        }

        let entries = read_page(&mut self.file.borrow_mut(), page_base)?;
        let page = Rc::new(RefCell::new(entries));
        self.cache.put(page_base, Rc::clone(&page))?;
        Ok(page)
    }
}

impl Drop for PositionalIndex {
    fn drop(&mut self) {
        // Best effort write-back on drop
        if let Err(e) = self.flush() {
            log::warn!("failed to write back index pages for {:?}: {}", self.path, e);
        }
    }
}

/// Page-aligned base of a byte offset.
fn page_base_of(offset: u64) -> u64 {
    (offset / PAGE_SIZE as u64) * PAGE_SIZE as u64
}

/// Read one page worth of entries at `page_base`, zero-filling whatever
/// lies past the end of the file.
fn read_page(file: &mut File, page_base: u64) -> Result<Vec<u64>> {
    let file_len = file.metadata()?.len();
    let available = file_len.saturating_sub(page_base).min(PAGE_SIZE as u64) as usize;

    let mut raw = vec![0u8; PAGE_SIZE];
    if available > 0 {
        file.seek(SeekFrom::Start(page_base))?;
        file.read_exact(&mut raw[..available])?;
    }

    let mut buf = &raw[..];
    let mut entries = Vec::with_capacity(ENTRIES_PER_PAGE);
    for _ in 0..ENTRIES_PER_PAGE {
        entries.push(buf.get_u64_le());
    }
    Ok(entries)
}

/// Write one page of entries back at `page_base`.
fn write_page(file: &mut File, page_base: u64, entries: &[u64]) -> Result<()> {
    let mut buf = BytesMut::with_capacity(PAGE_SIZE);
    for entry in entries {
        buf.put_u64_le(*entry);
    }

    file.seek(SeekFrom::Start(page_base))?;
    file.write_all(&buf)?;
    Ok(())
}
