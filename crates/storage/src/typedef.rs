/// Identifies a page on disk and in the buffer pool.
pub type PageId = u32;

/// Identifies a frame slot in the buffer pool, in `[0, pool_size)`.
pub type FrameId = usize;
