use std::cmp::Ordering;
use std::mem;
use std::ops::{Deref, DerefMut};

use crate::frame::PageFrame;
use crate::frame_handle::{PageFrameMutHandle, PageFrameRefHandle};
use crate::page::b_plus_tree_page::{
    BPlusTreePageHeader, GenericKey, B_PLUS_TREE_PAGE_HEADER_SIZE, INTERNAL_PAGE_TYPE,
};
use crate::page::PAGE_SIZE;
use crate::typedef::PageId;

/// In-frame view of a B+-tree internal node.
///
/// Entries are `(key, child page id)` pairs packed tightly after the header.
/// Slot 0's key is unused: its child holds everything smaller than the key at
/// slot 1, so lookups treat it as negative infinity.
pub struct BPlusTreeInternalPage<T, const N: usize> {
    page_frame_handle: T,
}

impl<T: Deref<Target = PageFrame>, const N: usize> BPlusTreeInternalPage<T, N> {
    const ENTRY_SIZE: usize = N + mem::size_of::<PageId>();

    /// Largest number of entries the page data area can hold.
    pub fn capacity() -> usize {
        (PAGE_SIZE - B_PLUS_TREE_PAGE_HEADER_SIZE) / Self::ENTRY_SIZE
    }

    fn entry_offset(index: usize) -> usize {
        B_PLUS_TREE_PAGE_HEADER_SIZE + index * Self::ENTRY_SIZE
    }

    fn header(&self) -> &BPlusTreePageHeader {
        bytemuck::from_bytes(&self.page_frame_handle.data()[..B_PLUS_TREE_PAGE_HEADER_SIZE])
    }

    pub fn page_id(&self) -> PageId {
        self.page_frame_handle.page_id()
    }

    /// Number of entries currently stored, counting the sentinel slot 0.
    pub fn size(&self) -> usize {
        self.header().size as usize
    }

    pub fn max_size(&self) -> usize {
        self.header().max_size as usize
    }

    pub fn key_at(&self, index: usize) -> GenericKey<N> {
        assert!(index < self.size());
        let offset = Self::entry_offset(index);
        bytemuck::pod_read_unaligned(&self.page_frame_handle.data()[offset..offset + N])
    }

    pub fn value_at(&self, index: usize) -> PageId {
        assert!(index < self.size());
        let offset = Self::entry_offset(index) + N;
        bytemuck::pod_read_unaligned(
            &self.page_frame_handle.data()[offset..offset + mem::size_of::<PageId>()],
        )
    }

    /// Lowest index whose key is not less than `key` (classical lower bound
    /// over `[0, size)`).
    pub fn index<F>(&self, key: &GenericKey<N>, comparator: &F) -> usize
    where
        F: Fn(&GenericKey<N>, &GenericKey<N>) -> Ordering,
    {
        let mut lo = 0;
        let mut hi = self.size();
        while lo < hi {
            let mid = (lo + hi) / 2;
            if comparator(&self.key_at(mid), key) == Ordering::Less {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// First index whose value equals `value`, or `size` if absent.
    pub fn value_index(&self, value: PageId) -> usize {
        (0..self.size())
            .find(|&i| self.value_at(i) == value)
            .unwrap_or_else(|| self.size())
    }

    /// Child page id to follow when descending for `key`: upper bound over
    /// the keys starting at slot 1, stepped back one.
    pub fn lookup<F>(&self, key: &GenericKey<N>, comparator: &F) -> PageId
    where
        F: Fn(&GenericKey<N>, &GenericKey<N>) -> Ordering,
    {
        let mut lo = 1;
        let mut hi = self.size();
        while lo < hi {
            let mid = (lo + hi) / 2;
            if comparator(key, &self.key_at(mid)) == Ordering::Less {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        self.value_at(lo - 1)
    }
}

impl<T, const N: usize> BPlusTreeInternalPage<T, N>
where
    T: Deref<Target = PageFrame> + DerefMut<Target = PageFrame>,
{
    fn header_mut(&mut self) -> &mut BPlusTreePageHeader {
        bytemuck::from_bytes_mut(
            &mut self.page_frame_handle.data_mut()[..B_PLUS_TREE_PAGE_HEADER_SIZE],
        )
    }

    /// Stamps the page as an empty internal node with the given fan-out.
    pub fn init(&mut self, max_size: usize) {
        assert!(max_size >= 2 && max_size <= Self::capacity());
        *self.header_mut() = BPlusTreePageHeader {
            page_type: INTERNAL_PAGE_TYPE,
            size: 0,
            max_size: max_size as u32,
        };
    }

    pub fn set_key_at(&mut self, index: usize, key: &GenericKey<N>) {
        assert!(index < self.size());
        let offset = Self::entry_offset(index);
        self.page_frame_handle.data_mut()[offset..offset + N].copy_from_slice(&key.0);
    }

    pub fn set_value_at(&mut self, index: usize, value: PageId) {
        assert!(index < self.size());
        let offset = Self::entry_offset(index) + N;
        self.page_frame_handle.data_mut()[offset..offset + mem::size_of::<PageId>()]
            .copy_from_slice(bytemuck::bytes_of(&value));
    }

    /// Shifts the suffix starting at `index` right by one entry and places
    /// the new pair there.
    pub fn insert_at(&mut self, index: usize, key: &GenericKey<N>, value: PageId) {
        let size = self.size();
        assert!(size < self.max_size(), "insert into a full internal page");
        assert!(index <= size);

        let start = Self::entry_offset(index);
        let end = Self::entry_offset(size);
        let data = self.page_frame_handle.data_mut();
        data.copy_within(start..end, start + Self::ENTRY_SIZE);
        data[start..start + N].copy_from_slice(&key.0);
        data[start + N..start + Self::ENTRY_SIZE].copy_from_slice(bytemuck::bytes_of(&value));

        self.header_mut().size += 1;
    }

    /// Inserts the pair at its sorted position.
    pub fn insort<F>(&mut self, key: &GenericKey<N>, value: PageId, comparator: &F)
    where
        F: Fn(&GenericKey<N>, &GenericKey<N>) -> Ordering,
    {
        let index = self.index(key, comparator);
        self.insert_at(index, key, value);
    }

    /// Moves the right portion of this page's entries into `other`, which
    /// must be freshly initialized and empty. The left page keeps
    /// `ceil((max_size + 1) / 2)` entries so the sentinel child at slot 0
    /// stays anchored; the caller promotes the separator key.
    pub fn split<U>(&mut self, other: &mut BPlusTreeInternalPage<U, N>)
    where
        U: Deref<Target = PageFrame> + DerefMut<Target = PageFrame>,
    {
        assert_eq!(other.size(), 0, "split target must be empty");
        let size = self.size();
        assert_eq!(size, self.max_size(), "split expects a full page");
        let keep = (self.max_size() + 2) / 2;
        for i in keep..size {
            let key = self.key_at(i);
            let value = self.value_at(i);
            other.insert_at(other.size(), &key, value);
        }
        self.header_mut().size = keep as u32;
    }
}

/// Type alias for an immutable internal page view.
pub type BPlusTreeInternalPageRef<'a, const N: usize> =
    BPlusTreeInternalPage<PageFrameRefHandle<'a>, N>;
/// Type alias for a mutable internal page view.
pub type BPlusTreeInternalPageMut<'a, const N: usize> =
    BPlusTreeInternalPage<PageFrameMutHandle<'a>, N>;

impl<'a, const N: usize> From<PageFrameRefHandle<'a>> for BPlusTreeInternalPageRef<'a, N> {
    fn from(page_frame_handle: PageFrameRefHandle<'a>) -> Self {
        BPlusTreeInternalPage { page_frame_handle }
    }
}

impl<'a, const N: usize> From<PageFrameMutHandle<'a>> for BPlusTreeInternalPageMut<'a, N> {
    fn from(page_frame_handle: PageFrameMutHandle<'a>) -> Self {
        BPlusTreeInternalPage { page_frame_handle }
    }
}
