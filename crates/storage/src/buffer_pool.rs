use granite_error::Error;
use tracing::debug;

use crate::disk::disk_manager::DiskManager;
use crate::frame::PageFrame;
use crate::frame_handle::{PageFrameBasicHandle, PageFrameMutHandle, PageFrameRefHandle};
use crate::typedef::{FrameId, PageId};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use crate::Result;

use crate::replacer::replacer::Replacer;

/// Manages page allocation, caching, and eviction in the buffer pool.
///
/// All structural state (page table, free list, replacer, frame metadata)
/// is covered by the single latch of the enclosing `Arc<RwLock<..>>`; every
/// operation here runs for its full duration under that latch, including
/// disk I/O, which keeps clean-frame acquisition atomic.
#[derive(Debug)]
pub struct BufferPoolManager {
    frames: Vec<PageFrame>, // Storage for all frames in the buffer pool
    page_table: HashMap<PageId, FrameId>, // Maps page IDs to frame IDs
    replacer: Box<dyn Replacer>, // Handles page replacement policy
    free_list: VecDeque<FrameId>, // List of free frames
    disk_manager: Arc<Mutex<DiskManager>>, // Manages reading/writing pages to disk
    next_page_id: PageId,   // Monotonic page id allocator; never reuses an id
}

impl BufferPoolManager {
    /// Initializes the buffer pool with a given size.
    pub fn new(
        pool_size: usize,
        disk_manager: Arc<Mutex<DiskManager>>,
        replacer: Box<dyn Replacer>,
    ) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        frames.resize_with(pool_size, PageFrame::new);

        Self {
            frames,
            page_table: HashMap::new(),
            replacer,
            free_list: (0..pool_size).collect(),
            disk_manager,
            next_page_id: 1, // page id 0 is the invalid-page sentinel
        }
    }

    /// Hands out the next page id. Ids are unique for the life of the pool.
    fn allocate_page(&mut self) -> PageId {
        let page_id = self.next_page_id;
        self.next_page_id += 1;
        page_id
    }

    /// Returns a free frame or evicts a page if necessary.
    fn get_free_frame(&mut self) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.pop_front() {
            return Ok(frame_id);
        }

        // Evict a page if no free frames are available
        let frame_id = self.replacer.evict().ok_or(Error::PoolExhausted)?;
        let frame = &mut self.frames[frame_id];
        assert_eq!(
            frame.pin_count(),
            0,
            "If page is evicted from replacer, its pin count must be 0."
        );

        // Write dirty page back to disk before eviction
        if frame.is_dirty() {
            debug!(
                page_id = frame.page_id(),
                frame_id, "writing back dirty page before eviction"
            );
            let mut disk = self.disk_manager.lock()?;
            disk.write(frame.page_id(), frame.data())?;
        }

        // Remove old page from the page table
        let old_page_id = frame.page_id();
        self.page_table.remove(&old_page_id);

        // Reset the frame for reuse
        self.frames[frame_id].reset();

        Ok(frame_id)
    }

    /// Allocates a new page and loads it into a free frame. The returned
    /// frame is pinned once and starts out clean and zero-filled.
    pub fn create_page(&mut self) -> Result<&mut PageFrame> {
        // get a free frame
        let frame_id = self.get_free_frame()?;

        // allocate a new page id and install it
        let page_id = self.allocate_page();
        self.page_table.insert(page_id, frame_id);

        // update the replacer: a pinned frame must not be evictable
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);

        // bind the frame (it was reset by get_free_frame)
        let frame = &mut self.frames[frame_id];
        frame.assign(page_id);

        Ok(frame)
    }

    /// Pins the frame holding `page_id`, reading the page in from disk on a
    /// miss, and returns its id.
    fn fetch_frame(&mut self, page_id: PageId) -> Result<FrameId> {
        // check if the page is already in memory
        if let Some(&frame_id) = self.page_table.get(&page_id) {
            self.frames[frame_id].pin();
            self.replacer.record_access(frame_id);
            self.replacer.set_evictable(frame_id, false);
            return Ok(frame_id);
        }

        // if not: get a free frame and load the page from disk
        let frame_id = self.get_free_frame()?;
        let bytes = self.disk_manager.lock()?.read(page_id)?;

        let frame = &mut self.frames[frame_id];
        if let Some(bytes) = bytes {
            frame.data_mut().copy_from_slice(&bytes);
        }
        frame.assign(page_id);

        // update page table and replacer
        self.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);

        Ok(frame_id)
    }

    /// Fetches an immutable reference to a page, loading it from disk if necessary.
    pub fn fetch_page(&mut self, page_id: PageId) -> Result<&PageFrame> {
        let frame_id = self.fetch_frame(page_id)?;
        Ok(&self.frames[frame_id])
    }

    /// Fetches a mutable reference to a page, loading it from disk if necessary.
    pub fn fetch_page_mut(&mut self, page_id: PageId) -> Result<&mut PageFrame> {
        let frame_id = self.fetch_frame(page_id)?;
        Ok(&mut self.frames[frame_id])
    }

    /// Unpins a page, allowing it to be evicted once the pin count reaches
    /// zero. The dirty flag is OR-combined; unpinning never cleans a page.
    ///
    /// Returns `false` if the page is not resident or was not pinned.
    pub fn unpin_page(&mut self, page_id: PageId, is_dirty: bool) -> bool {
        let Some(&frame_id) = self.page_table.get(&page_id) else {
            return false;
        };

        let frame = &mut self.frames[frame_id];
        if frame.pin_count() == 0 {
            return false;
        }

        let remaining = frame.unpin();
        frame.mark_dirty(is_dirty);

        if remaining == 0 {
            self.replacer.set_evictable(frame_id, true);
        }

        true
    }

    /// Flushes a specific page to disk, clearing its dirty flag. Pin count
    /// and evictability are unaffected.
    pub fn flush_page(&mut self, page_id: &PageId) -> Result<()> {
        let Some(&frame_id) = self.page_table.get(page_id) else {
            return Err(Error::PageNotResident(*page_id));
        };

        let frame = &mut self.frames[frame_id];
        let mut disk = self.disk_manager.lock()?;
        disk.write(*page_id, frame.data())?;
        frame.clear_dirty();

        Ok(())
    }

    /// Flushes every resident page to disk.
    pub fn flush_all_pages(&mut self) -> Result<()> {
        let page_ids: Vec<PageId> = self.page_table.keys().copied().collect();
        for page_id in page_ids {
            self.flush_page(&page_id)?;
        }
        Ok(())
    }

    /// Deletes a page from the buffer pool and releases its disk slot.
    /// Deleting a page that is not resident succeeds (the call is
    /// idempotent); deleting a pinned page fails. Dirty contents are
    /// discarded, not flushed.
    pub fn delete_page(&mut self, page_id: PageId) -> Result<()> {
        let Some(&frame_id) = self.page_table.get(&page_id) else {
            return Ok(());
        };

        if self.frames[frame_id].pin_count() > 0 {
            return Err(Error::PagePinned(page_id));
        }

        // remove from page table and replacer
        self.page_table.remove(&page_id);
        self.replacer.remove(frame_id);

        // reset the frame and recycle it
        self.frames[frame_id].reset();
        self.free_list.push_back(frame_id);

        // release the page's slot on disk
        self.disk_manager.lock()?.deallocate(page_id);

        Ok(())
    }

    /// Returns the total number of frames in the buffer pool.
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    /// Returns the number of frames that could hold a new page right now.
    pub(crate) fn free_frame_count(&self) -> usize {
        self.free_list.len() + self.replacer.evictable_count()
    }

    /// Returns the pin count of a page, or `None` if it is not in the buffer pool.
    pub(crate) fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let frame_id = self.page_table.get(&page_id)?;
        Some(self.frames[*frame_id].pin_count())
    }

    /// Returns whether a resident page is dirty, or `None` if it is not in
    /// the buffer pool.
    pub(crate) fn is_page_dirty(&self, page_id: PageId) -> Option<bool> {
        let frame_id = self.page_table.get(&page_id)?;
        Some(self.frames[*frame_id].is_dirty())
    }

    /// Creates a new page and returns a pin-only handle for it.
    pub fn create_page_handle(
        bpm: &Arc<RwLock<BufferPoolManager>>,
    ) -> Result<PageFrameBasicHandle> {
        let page_frame = {
            let mut bpm_guard = bpm.write()?;
            // SAFETY:
            // This function needs to return a handle that contains both a reference to a
            // page (created via `create_page()`) and the Arc to the BufferPoolManager.
            // However, `create_page()` returns a reference to a field inside the
            // BufferPoolManager, which is currently borrowed by `bpm_guard`. If we try to
            // call `PageFrameBasicHandle::new(&bpm, page_frame)` directly, the borrow
            // checker rejects it because the `page_frame` reference is tied to the
            // lifetime of `bpm_guard` (i.e. the entire BufferPoolManager is considered
            // borrowed).
            //
            // To work around this limitation, we temporarily extract a raw pointer from
            // the locked BufferPoolManager. This allows us to call `create_page()` and
            // obtain a reference to the page without having to keep the full `bpm_guard`
            // active. The frame we return is pinned, so it stays valid until the handle
            // unpins it.
            //
            // In summary, we use `unsafe` here solely to bypass the borrow check that
            // prevents splitting the borrow of the BufferPoolManager into two parts:
            // one for the container (bpm) and one for the page frame extracted from it.
            let bpm_ptr = &mut *bpm_guard as *mut BufferPoolManager;
            unsafe { (*bpm_ptr).create_page()? }
        };

        Ok(PageFrameBasicHandle::new(bpm, page_frame))
    }

    /// Fetches a pin-only handle to a page.
    pub fn fetch_page_basic_handle(
        bpm: &Arc<RwLock<BufferPoolManager>>,
        page_id: PageId,
    ) -> Result<PageFrameBasicHandle> {
        let page_frame = {
            let mut bpm_guard = bpm.write()?;
            // SAFETY: see `create_page_handle`
            let bpm_ptr = &mut *bpm_guard as *mut BufferPoolManager;
            unsafe { (*bpm_ptr).fetch_page_mut(page_id)? }
        };

        Ok(PageFrameBasicHandle::new(bpm, page_frame))
    }

    /// Fetches a read-only handle to a page. The pool latch is released
    /// before the handle takes the page's read latch.
    pub fn fetch_page_handle(
        bpm: &Arc<RwLock<BufferPoolManager>>,
        page_id: PageId,
    ) -> Result<PageFrameRefHandle> {
        let page_frame = {
            let mut bpm_guard = bpm.write()?;
            // SAFETY: see `create_page_handle`
            let bpm_ptr = &mut *bpm_guard as *mut BufferPoolManager;
            unsafe { (*bpm_ptr).fetch_page(page_id)? }
        };

        Ok(PageFrameRefHandle::new(bpm, page_frame))
    }

    /// Fetches a mutable handle to a page. The pool latch is released
    /// before the handle takes the page's write latch.
    pub fn fetch_page_mut_handle(
        bpm: &Arc<RwLock<BufferPoolManager>>,
        page_id: PageId,
    ) -> Result<PageFrameMutHandle> {
        let page_frame = {
            let mut bpm_guard = bpm.write()?;
            // SAFETY: see `create_page_handle`
            let bpm_ptr = &mut *bpm_guard as *mut BufferPoolManager;
            unsafe { (*bpm_ptr).fetch_page_mut(page_id)? }
        };

        Ok(PageFrameMutHandle::new(bpm, page_frame))
    }
}
