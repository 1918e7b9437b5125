use std::cmp::Ordering;
use std::mem;

use bytemuck::{Pod, Zeroable};

/// Page type tag stored in the first header word.
pub const INTERNAL_PAGE_TYPE: u32 = 1;
/// Page type tag stored in the first header word.
pub const LEAF_PAGE_TYPE: u32 = 2;

/// Header shared by internal and leaf index pages. Leaf pages extend it with
/// a sibling pointer (see [`super::b_plus_tree_leaf_page`]).
#[repr(C)]
#[derive(Pod, Zeroable, Copy, Clone, Debug)]
pub(crate) struct BPlusTreePageHeader {
    pub(crate) page_type: u32,
    pub(crate) size: u32,
    pub(crate) max_size: u32,
}

pub(crate) const B_PLUS_TREE_PAGE_HEADER_SIZE: usize = mem::size_of::<BPlusTreePageHeader>();

/// Fixed-width key stored inline in index pages.
///
/// The width is a compile-time parameter so an index can be instantiated for
/// the key size its schema needs (4, 8, 16, 32 or 64 bytes by convention).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GenericKey<const N: usize>(pub [u8; N]);

impl<const N: usize> Default for GenericKey<N> {
    fn default() -> Self {
        GenericKey([0; N])
    }
}

// SAFETY: a `GenericKey` is a plain byte array with no padding and no invalid
// bit patterns.
unsafe impl<const N: usize> Zeroable for GenericKey<N> {}
unsafe impl<const N: usize> Pod for GenericKey<N> {}

impl<const N: usize> GenericKey<N> {
    /// Builds a key from the leading bytes of `bytes`, zero-padded on the
    /// right when `bytes` is shorter than the key width.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut key = [0u8; N];
        let len = bytes.len().min(N);
        key[..len].copy_from_slice(&bytes[..len]);
        GenericKey(key)
    }

    /// Builds a key from the big-endian encoding of `value`, right-aligned
    /// and zero-padded on the left so that byte-wise ordering matches
    /// numeric ordering.
    pub fn from_u64(value: u64) -> Self {
        assert!(N >= mem::size_of::<u64>(), "key width too small for a u64");
        let mut key = [0u8; N];
        key[N - mem::size_of::<u64>()..].copy_from_slice(&value.to_be_bytes());
        GenericKey(key)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Byte-wise key comparator. Suits keys whose encoding already sorts
/// lexicographically (e.g. [`GenericKey::from_u64`]).
pub fn compare_generic<const N: usize>(a: &GenericKey<N>, b: &GenericKey<N>) -> Ordering {
    a.0.cmp(&b.0)
}
