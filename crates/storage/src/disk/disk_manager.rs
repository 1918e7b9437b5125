use crate::typedef::PageId;
use crate::Result;
use bytes::{Bytes, BytesMut};
use fs2::FileExt;
use granite_error::{errinput, Error};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{trace, warn};

const PAGE_SIZE_BYTES: usize = 4096;

/// Block-addressed store for fixed-size pages inside a single database file.
///
/// The disk manager only manages file slots; page ids are handed out by the
/// buffer pool. A page gets a slot on its first write, and deallocated slots
/// are reused for later pages.
#[derive(Debug)]
pub struct DiskManager {
    file: RefCell<std::fs::File>,
    /// The maximum capacity (in pages) that the file can hold before we resize it.
    page_capacity: usize,
    /// Map from page_id -> file offset
    pages: HashMap<PageId, u64>,
    /// Free file offsets to reuse for future page slots.
    free_slots: VecDeque<u64>,
}

impl DiskManager {
    /// Creates a new disk manager over the database file at `path`.
    /// The file is truncated and locked exclusively at creation.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Open or create the file, truncating it
        let file = std::fs::OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| Error::Io(format!("Unable to open file {}: {}", path.display(), e)))?;

        // Acquire an exclusive lock on the file at creation
        file.lock_exclusive()
            .map_err(|e| Error::Io(format!("Failed to acquire exclusive file lock: {}", e)))?;

        // Build the DiskManager struct
        let mut dm = Self {
            file: RefCell::new(file),
            page_capacity: 32, // Start with 32 as the default capacity
            pages: HashMap::new(),
            free_slots: VecDeque::new(),
        };

        // Initialize the file with enough space for `page_capacity + 1` pages
        dm.resize_file()?;

        Ok(dm)
    }

    /// Releases a page's file slot back for reuse. Unknown page ids are
    /// ignored; the page may never have been written out.
    pub fn deallocate(&mut self, page_id: PageId) {
        if let Some(offset) = self.pages.remove(&page_id) {
            self.free_slots.push_back(offset);
        }
    }

    /// Read a page if it exists. Returns `None` for pages that were never
    /// written to disk.
    pub fn read(&mut self, page_id: PageId) -> Result<Option<Bytes>> {
        let offset = match self.pages.get(&page_id) {
            Some(&off) => off,
            None => {
                // No slot recorded, the page has no on-disk contents yet
                return Ok(None);
            }
        };

        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(offset))?;

        let mut bytes = BytesMut::zeroed(PAGE_SIZE_BYTES);
        file.read_exact(&mut bytes)?;
        trace!(page_id, offset, "read page");
        Ok(Some(bytes.freeze()))
    }

    /// Write data to a page. Must not exceed PAGE_SIZE_BYTES.
    pub fn write(&mut self, page_id: PageId, data: &[u8]) -> Result<()> {
        if data.len() > PAGE_SIZE_BYTES {
            return errinput!("Page data must fit in a page.");
        }

        // If we don't already have an offset for this page, allocate a new one.
        let offset = match self.pages.get(&page_id) {
            Some(&off) => off,
            None => {
                let off = self.allocate_offset()?; // reuses a free slot or appends
                self.pages.insert(page_id, off);
                off
            }
        };

        let mut file = self.file.borrow_mut();
        file.seek(std::io::SeekFrom::Start(offset))?;
        file.write_all(data)?;
        file.sync_all()?;
        trace!(page_id, offset, "wrote page");

        Ok(())
    }

    /// Helper: For new slots, we either reuse a free offset from `free_slots` or append at the end.
    fn allocate_offset(&mut self) -> Result<u64> {
        // If we have a free offset from a previously deleted page, reuse it
        if let Some(off) = self.free_slots.pop_front() {
            return Ok(off);
        }

        // Otherwise, offset is pages.len() * PAGE_SIZE_BYTES,
        // but only if we have capacity
        let used_pages = self.pages.len() as u64;
        if used_pages + 1 >= self.page_capacity as u64 {
            // resize (double capacity) if needed
            self.page_capacity *= 2;
            self.resize_file()?;
        }

        // The new offset is used_pages * PAGE_SIZE_BYTES
        let offset = used_pages * PAGE_SIZE_BYTES as u64;
        Ok(offset)
    }

    /// Actually resizes the underlying file to (page_capacity + 1) * PAGE_SIZE_BYTES
    fn resize_file(&mut self) -> Result<()> {
        let size = (self.page_capacity as u64 + 1) * PAGE_SIZE_BYTES as u64;
        let file = self.file.borrow();
        file.set_len(size)
            .map_err(|e| Error::Io(format!("Failed to resize file: {}", e)))?;
        Ok(())
    }

    /// Returns the current size of the database file.
    pub fn get_db_file_size(&self) -> Result<u64> {
        let file = self.file.borrow();
        file.metadata()
            .map(|meta| meta.len())
            .map_err(|e| Error::Io(format!("Failed to get file size: {}", e)))
    }
}

impl Drop for DiskManager {
    /// We unlock the file when the DiskManager is dropped, so a new instance
    /// (or another process) can take over the database file.
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&*self.file.borrow()) {
            warn!("failed to unlock database file: {e}");
        }
    }
}
