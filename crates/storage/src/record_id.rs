use bytemuck::{Pod, Zeroable};

use crate::{page::INVALID_PAGE_ID, typedef::PageId};

/// Identifies a single record: the page it lives on plus its position there.
///
/// Record ids are stored inline in index pages, so the layout is fixed and
/// byte-castable.
#[repr(C)]
#[derive(Pod, Zeroable, Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecordId {
    /// The ID of the page the record lives inside.
    page_id: PageId,
    /// The offset of the record in the list of page slots. Not to be confused
    /// with the byte offset of the record in the page data!
    slot_id: u32,
}

pub const INVALID_RECORD_ID: RecordId = RecordId {
    page_id: INVALID_PAGE_ID,
    slot_id: 0,
};

/// The specific fields of a `RecordId` won't be of importance in every context that a record
/// id will be passed around; sometimes, all we need is an identifier of the record itself.
///
/// In those cases, it can be more convenient to pass around the record id as an int than the
/// struct in full. This provides an easy way to convert between these two representations.
impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self {
            page_id: (value >> 32) as PageId,
            slot_id: value as u32,
        }
    }
}
impl From<RecordId> for u64 {
    fn from(record: RecordId) -> Self {
        u64::from(record.page_id) << 32 | u64::from(record.slot_id)
    }
}

impl RecordId {
    pub fn new(page_id: PageId, slot_id: u32) -> RecordId {
        RecordId { page_id, slot_id }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn slot_id(&self) -> u32 {
        self.slot_id
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.page_id, self.slot_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_u64_roundtrip() {
        let rid = RecordId::new(7, 21);
        let packed: u64 = rid.into();
        assert_eq!(packed, (7u64 << 32) | 21);
        assert_eq!(RecordId::from(packed), rid);
    }

    #[test]
    fn test_record_id_ordering() {
        assert!(RecordId::new(1, 5) < RecordId::new(2, 0));
        assert!(RecordId::new(2, 1) < RecordId::new(2, 3));
        assert_eq!(RecordId::new(3, 3), RecordId::new(3, 3));
    }
}
