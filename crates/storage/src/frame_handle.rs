use crate::buffer_pool::BufferPoolManager;
use crate::frame::PageFrame;
use core::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A handle holding only a pin on a `PageFrame`, no page latch.
///
/// The handle carries a deferred dirty flag: callers that modify the page
/// through it announce the fact with [`Self::set_dirty`], and the flag is
/// handed to the buffer pool when the pin is dropped. `release` unpins
/// immediately; calling it (or dropping) more than once unpins only once.
pub struct PageFrameBasicHandle<'a> {
    bpm: &'a Arc<RwLock<BufferPoolManager>>,
    page_frame: Option<&'a mut PageFrame>,
    is_dirty: bool,
}

impl fmt::Debug for PageFrameBasicHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFrameBasicHandle")
            .field("page_frame", &self.page_frame)
            .field("is_dirty", &self.is_dirty)
            .finish()
    }
}

impl<'a> PageFrameBasicHandle<'a> {
    /// Creates a new pin-only page handle.
    pub(crate) fn new(
        bpm: &'a Arc<RwLock<BufferPoolManager>>,
        page_frame: &'a mut PageFrame,
    ) -> Self {
        PageFrameBasicHandle {
            bpm,
            page_frame: Some(page_frame),
            is_dirty: false,
        }
    }

    /// Marks the page as modified; propagated to the buffer pool at unpin.
    pub fn set_dirty(&mut self) {
        self.is_dirty = true;
    }

    /// Unpins the page now instead of at scope exit. Subsequent calls (and
    /// the eventual drop) do nothing.
    pub fn release(&mut self) {
        if let Some(page_frame) = self.page_frame.take() {
            let page_id = page_frame.page_id();
            self.bpm.write().unwrap().unpin_page(page_id, self.is_dirty);
        }
    }
}

impl<'a> Drop for PageFrameBasicHandle<'a> {
    fn drop(&mut self) {
        self.release();
    }
}

/// A handle for a read-only `PageFrame`.
///
/// Holds a pin plus the page's read latch. When the handle is dropped the
/// latch is released first, then the page is unpinned, allowing it to be
/// evicted if necessary.
pub struct PageFrameRefHandle<'a> {
    bpm: &'a Arc<RwLock<BufferPoolManager>>,
    page_frame: &'a PageFrame,
    lock_guard: Option<RwLockReadGuard<'a, ()>>,
}

impl fmt::Debug for PageFrameRefHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFrameRefHandle")
            .field("page_frame", &self.page_frame)
            .finish()
    }
}

impl<'a> PageFrameRefHandle<'a> {
    /// Creates a new read-only page handle. Blocks until the page's read
    /// latch is available.
    pub(crate) fn new(bpm: &'a Arc<RwLock<BufferPoolManager>>, page_frame: &'a PageFrame) -> Self {
        let lock_guard = page_frame.latch_shared();
        PageFrameRefHandle {
            bpm,
            page_frame,
            lock_guard: Some(lock_guard),
        }
    }
}

impl<'a> Drop for PageFrameRefHandle<'a> {
    fn drop(&mut self) {
        // Release the page latch before re-entering the pool, so a thread
        // holding the pool latch can never wait on this page latch.
        drop(self.lock_guard.take());
        self.bpm
            .write()
            .unwrap()
            .unpin_page(self.page_frame.page_id(), false);
    }
}

/// Mutable page handle for write access.
///
/// Holds a pin plus the page's write latch; the page is unpinned dirty.
pub struct PageFrameMutHandle<'a> {
    bpm: &'a Arc<RwLock<BufferPoolManager>>,
    page_frame: &'a mut PageFrame,
    lock_guard: Option<RwLockWriteGuard<'a, ()>>,
}

impl fmt::Debug for PageFrameMutHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFrameMutHandle")
            .field("page_frame", &self.page_frame)
            .finish()
    }
}

impl<'a> PageFrameMutHandle<'a> {
    /// Creates a new mutable page handle. Blocks until the page's write
    /// latch is available.
    pub(crate) fn new(
        bpm: &'a Arc<RwLock<BufferPoolManager>>,
        page_frame: &'a mut PageFrame,
    ) -> Self {
        let fp_ptr = &mut *page_frame as *mut PageFrame;
        // SAFETY:
        // The latch guard borrows the frame immutably while the handle also
        // keeps the exclusive `page_frame` reference for data access. Both
        // refer to the same pinned frame; the latch field itself is never
        // reached through the mutable reference, so the aliasing is confined
        // to disjoint parts of the struct.
        let lock_guard = unsafe { (*fp_ptr).latch_exclusive() };
        PageFrameMutHandle {
            bpm,
            page_frame,
            lock_guard: Some(lock_guard),
        }
    }
}

impl<'a> Drop for PageFrameMutHandle<'a> {
    fn drop(&mut self) {
        // Latch first, then unpin; same ordering as the read handle.
        drop(self.lock_guard.take());
        self.bpm
            .write()
            .unwrap()
            .unpin_page(self.page_frame.page_id(), true);
    }
}

/// Implement `Deref` for `PageFrameBasicHandle` to provide transparent access to `PageFrame`.
impl<'a> Deref for PageFrameBasicHandle<'a> {
    type Target = PageFrame;

    fn deref(&self) -> &Self::Target {
        self.page_frame
            .as_deref()
            .expect("page handle already released")
    }
}

/// Implement `DerefMut` for `PageFrameBasicHandle` to allow mutable access to `PageFrame`.
impl<'a> DerefMut for PageFrameBasicHandle<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.page_frame
            .as_deref_mut()
            .expect("page handle already released")
    }
}

/// Implement `Deref` for `PageFrameRefHandle` to provide transparent access to `PageFrame`.
impl<'a> Deref for PageFrameRefHandle<'a> {
    type Target = PageFrame;

    fn deref(&self) -> &Self::Target {
        self.page_frame
    }
}

/// Implement `Deref` for `PageFrameMutHandle` to provide transparent access to `PageFrame`.
impl<'a> Deref for PageFrameMutHandle<'a> {
    type Target = PageFrame;

    fn deref(&self) -> &Self::Target {
        self.page_frame
    }
}

/// Implement `DerefMut` for `PageFrameMutHandle` to allow mutable access to `PageFrame`.
impl<'a> DerefMut for PageFrameMutHandle<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.page_frame
    }
}
