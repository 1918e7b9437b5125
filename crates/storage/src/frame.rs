use core::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    page::{INVALID_PAGE_ID, PAGE_SIZE},
    typedef::PageId,
};

/// Page-sized byte buffer, 8-aligned so typed header views can be cast out
/// of the leading bytes with `bytemuck`.
#[repr(C, align(8))]
struct PageData([u8; PAGE_SIZE]);

/// One buffer-pool slot: a page's bytes plus the bookkeeping shared between
/// the pool and the frame handles.
///
/// All metadata lives under the pool latch, so the pin count is a plain
/// counter, not an atomic. Only the page latch and the data bytes are ever
/// touched while the pool latch is released.
pub struct PageFrame {
    data: PageData,
    page_id: PageId,
    dirty: bool,
    pins: u32,
    latch: RwLock<()>,
}

impl fmt::Debug for PageFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFrame")
            .field("page_id", &self.page_id)
            .field("pins", &self.pins)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl PageFrame {
    /// Creates an unoccupied frame.
    pub(crate) fn new() -> Self {
        Self {
            data: PageData([0; PAGE_SIZE]),
            page_id: INVALID_PAGE_ID,
            dirty: false,
            pins: 0,
            latch: RwLock::new(()),
        }
    }

    /// Id of the page held here, or `INVALID_PAGE_ID` for a free frame.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Read-only view of the page bytes.
    pub fn data(&self) -> &[u8] {
        &self.data.0
    }

    /// Mutable view of the page bytes. Callers announce modifications via
    /// the dirty flag at unpin time, not here.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data.0
    }

    /// Copies `bytes` into the page at `offset`.
    pub fn write(&mut self, offset: usize, bytes: &[u8]) {
        let end = offset + bytes.len();
        assert!(end <= PAGE_SIZE, "write past the end of the page");
        self.data.0[offset..end].copy_from_slice(bytes);
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// OR-combines into the dirty flag: once dirty, the frame stays dirty
    /// until a flush or a reset, no matter what later unpins report.
    pub(crate) fn mark_dirty(&mut self, dirty: bool) {
        self.dirty |= dirty;
    }

    /// Clears the dirty flag after the bytes reach the disk manager.
    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn pin_count(&self) -> u32 {
        self.pins
    }

    /// Takes one pin, returning the new count.
    pub(crate) fn pin(&mut self) -> u32 {
        self.pins += 1;
        self.pins
    }

    /// Releases one pin, returning the new count. A frame with no pins has
    /// nothing to release.
    pub(crate) fn unpin(&mut self) -> u32 {
        assert!(
            self.pins > 0,
            "frame for page {} has no pins to release",
            self.page_id
        );
        self.pins -= 1;
        self.pins
    }

    /// Binds a freshly acquired frame to `page_id`: clean, pinned once.
    pub(crate) fn assign(&mut self, page_id: PageId) {
        self.page_id = page_id;
        self.dirty = false;
        self.pins = 1;
    }

    /// Returns the frame to its unoccupied state, zeroing the bytes.
    pub(crate) fn reset(&mut self) {
        self.page_id = INVALID_PAGE_ID;
        self.dirty = false;
        self.pins = 0;
        self.data.0.fill(0);
    }

    /// Takes the page latch in shared mode, for read handles.
    pub(crate) fn latch_shared(&self) -> RwLockReadGuard<'_, ()> {
        self.latch.read().unwrap()
    }

    /// Takes the page latch in exclusive mode, for write handles.
    pub(crate) fn latch_exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.latch.write().unwrap()
    }
}
