use std::cmp::Ordering;
use std::mem;
use std::ops::{Deref, DerefMut};

use bytemuck::{Pod, Zeroable};

use crate::frame::PageFrame;
use crate::frame_handle::{PageFrameMutHandle, PageFrameRefHandle};
use crate::page::b_plus_tree_page::{GenericKey, LEAF_PAGE_TYPE};
use crate::page::{INVALID_PAGE_ID, PAGE_SIZE};
use crate::record_id::RecordId;
use crate::typedef::PageId;

/// Header of a B+-tree leaf node: the shared index-page fields plus the
/// sibling pointer that chains leaves for range scans.
#[repr(C)]
#[derive(Pod, Zeroable, Copy, Clone, Debug)]
pub(crate) struct BPlusTreeLeafPageHeader {
    pub(crate) page_type: u32,
    pub(crate) size: u32,
    pub(crate) max_size: u32,
    pub(crate) next_page_id: PageId,
}

pub(crate) const B_PLUS_TREE_LEAF_PAGE_HEADER_SIZE: usize =
    mem::size_of::<BPlusTreeLeafPageHeader>();

/// In-frame view of a B+-tree leaf node.
///
/// Entries are `(key, record id)` pairs packed tightly after the header and
/// kept in key order.
pub struct BPlusTreeLeafPage<T, const N: usize> {
    page_frame_handle: T,
}

impl<T: Deref<Target = PageFrame>, const N: usize> BPlusTreeLeafPage<T, N> {
    const ENTRY_SIZE: usize = N + mem::size_of::<RecordId>();

    /// Largest number of entries the page data area can hold.
    pub fn capacity() -> usize {
        (PAGE_SIZE - B_PLUS_TREE_LEAF_PAGE_HEADER_SIZE) / Self::ENTRY_SIZE
    }

    fn entry_offset(index: usize) -> usize {
        B_PLUS_TREE_LEAF_PAGE_HEADER_SIZE + index * Self::ENTRY_SIZE
    }

    fn header(&self) -> &BPlusTreeLeafPageHeader {
        bytemuck::from_bytes(&self.page_frame_handle.data()[..B_PLUS_TREE_LEAF_PAGE_HEADER_SIZE])
    }

    pub fn page_id(&self) -> PageId {
        self.page_frame_handle.page_id()
    }

    pub fn size(&self) -> usize {
        self.header().size as usize
    }

    pub fn max_size(&self) -> usize {
        self.header().max_size as usize
    }

    /// Page id of the right sibling, or `INVALID_PAGE_ID` at the end of the
    /// chain.
    pub fn next_page_id(&self) -> PageId {
        self.header().next_page_id
    }

    pub fn key_at(&self, index: usize) -> GenericKey<N> {
        assert!(index < self.size());
        let offset = Self::entry_offset(index);
        bytemuck::pod_read_unaligned(&self.page_frame_handle.data()[offset..offset + N])
    }

    pub fn value_at(&self, index: usize) -> RecordId {
        assert!(index < self.size());
        let offset = Self::entry_offset(index) + N;
        bytemuck::pod_read_unaligned(
            &self.page_frame_handle.data()[offset..offset + mem::size_of::<RecordId>()],
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

    /// Record id stored under `key`, or `None` when the slot found by lower
    /// bound does not compare equal.
    pub fn lookup<F>(&self, key: &GenericKey<N>, comparator: &F) -> Option<RecordId>
    where
        F: Fn(&GenericKey<N>, &GenericKey<N>) -> Ordering,
    {
        let index = self.index(key, comparator);
        if index == self.size() || comparator(&self.key_at(index), key) != Ordering::Equal {
            return None;
        }
        Some(self.value_at(index))
    }
}

impl<T, const N: usize> BPlusTreeLeafPage<T, N>
where
    T: Deref<Target = PageFrame> + DerefMut<Target = PageFrame>,
{
    fn header_mut(&mut self) -> &mut BPlusTreeLeafPageHeader {
        bytemuck::from_bytes_mut(
            &mut self.page_frame_handle.data_mut()[..B_PLUS_TREE_LEAF_PAGE_HEADER_SIZE],
        )
    }

    /// Stamps the page as an empty leaf with the given capacity and no
    /// sibling.
    pub fn init(&mut self, max_size: usize) {
        assert!(max_size >= 1 && max_size <= Self::capacity());
        *self.header_mut() = BPlusTreeLeafPageHeader {
            page_type: LEAF_PAGE_TYPE,
            size: 0,
            max_size: max_size as u32,
            next_page_id: INVALID_PAGE_ID,
        };
    }

    pub fn set_next_page_id(&mut self, next_page_id: PageId) {
        self.header_mut().next_page_id = next_page_id;
    }

    pub fn set_key_at(&mut self, index: usize, key: &GenericKey<N>) {
        assert!(index < self.size());
        let offset = Self::entry_offset(index);
        self.page_frame_handle.data_mut()[offset..offset + N].copy_from_slice(&key.0);
    }

    /// Shifts the suffix starting at `index` right by one entry and places
    /// the new pair there.
    pub fn insert_at(&mut self, index: usize, key: &GenericKey<N>, value: RecordId) {
        let size = self.size();
        assert!(size < self.max_size(), "insert into a full leaf page");
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
    pub fn insort<F>(&mut self, key: &GenericKey<N>, value: RecordId, comparator: &F)
    where
        F: Fn(&GenericKey<N>, &GenericKey<N>) -> Ordering,
    {
        let index = self.index(key, comparator);
        self.insert_at(index, key, value);
    }

    /// Moves the right half of this page's entries into `other`, which must
    /// be freshly initialized and empty. The left page keeps
    /// `max_size / 2` entries; the caller re-links the sibling chain.
    pub fn split<U>(&mut self, other: &mut BPlusTreeLeafPage<U, N>)
    where
        U: Deref<Target = PageFrame> + DerefMut<Target = PageFrame>,
    {
        assert_eq!(other.size(), 0, "split target must be empty");
        let size = self.size();
        assert_eq!(size, self.max_size(), "split expects a full page");
        let keep = self.max_size() / 2;
        for i in keep..size {
            let key = self.key_at(i);
            let value = self.value_at(i);
            other.insert_at(other.size(), &key, value);
        }
        self.header_mut().size = keep as u32;
    }
}

/// Type alias for an immutable leaf page view.
pub type BPlusTreeLeafPageRef<'a, const N: usize> = BPlusTreeLeafPage<PageFrameRefHandle<'a>, N>;
/// Type alias for a mutable leaf page view.
pub type BPlusTreeLeafPageMut<'a, const N: usize> = BPlusTreeLeafPage<PageFrameMutHandle<'a>, N>;

impl<'a, const N: usize> From<PageFrameRefHandle<'a>> for BPlusTreeLeafPageRef<'a, N> {
    fn from(page_frame_handle: PageFrameRefHandle<'a>) -> Self {
        BPlusTreeLeafPage { page_frame_handle }
    }
}

impl<'a, const N: usize> From<PageFrameMutHandle<'a>> for BPlusTreeLeafPageMut<'a, N> {
    fn from(page_frame_handle: PageFrameMutHandle<'a>) -> Self {
        BPlusTreeLeafPage { page_frame_handle }
    }
}
