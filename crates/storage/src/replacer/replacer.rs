use std::fmt::Debug;

use crate::typedef::FrameId;

/// Replacement policy consulted by the buffer pool when it needs a victim
/// frame.
///
/// A policy only knows about frames the pool has reported via
/// [`Replacer::record_access`], and it never hands out a frame flagged
/// non-evictable. The pool flags a frame non-evictable while any pin is
/// outstanding and flips it back when the last pin drops.
pub trait Replacer: Send + Sync + Debug {
    /// Notes an access to `frame_id` at the policy's current logical time,
    /// starting to track the frame if it is new.
    fn record_access(&mut self, frame_id: FrameId);

    /// Flags whether `frame_id` may be chosen as a victim. Unknown frames
    /// are ignored.
    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool);

    /// Chooses a victim among the evictable frames and stops tracking it.
    /// Returns `None` when no tracked frame is evictable.
    fn evict(&mut self) -> Option<FrameId>;

    /// Stops tracking `frame_id` without going through victim selection,
    /// e.g. when its page is deleted. The frame must be evictable.
    fn remove(&mut self, frame_id: FrameId);

    /// Number of tracked frames currently flagged evictable.
    fn evictable_count(&self) -> usize;
}
