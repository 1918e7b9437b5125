use super::replacer::Replacer;
use crate::typedef::FrameId;
use hashlink::LinkedHashMap;
use std::collections::{HashMap, VecDeque};
use tracing::trace;

/// Represents a node in the LrukReplacer, maintaining access history and evictability status.
#[derive(Debug)]
struct LrukNode {
    is_evictable: bool,
    history: VecDeque<u64>, // Stores the last K access timestamps, oldest first
    k: usize,
}

impl LrukNode {
    /// Creates an LrukNode, which is not evictable by default.
    fn new(k: usize) -> Self {
        Self {
            is_evictable: false,
            history: VecDeque::with_capacity(k),
            k,
        }
    }

    /// Checks if the node has an infinite backward K-distance, i.e. it has
    /// been accessed fewer than K times so far.
    fn has_inf_backward_k_dist(&self) -> bool {
        self.history.len() < self.k
    }

    /// Inserts a new access timestamp, maintaining the last K timestamps.
    fn insert_history_timestamp(&mut self, current_timestamp: u64) {
        assert!(self.history.is_empty() || current_timestamp > *self.history.back().unwrap());
        self.history.push_back(current_timestamp);
        if self.history.len() > self.k {
            self.history.pop_front();
        }
    }
}

/// Implements the LRU-K replacement policy.
///
/// Tracked frames live in exactly one of two queues: the history queue holds
/// frames with fewer than K recorded accesses (FIFO by first access), the
/// cache queue holds frames with at least K accesses, least recently accessed
/// at the front. Eviction scans the history queue first, so frames with an
/// infinite backward K-distance always go before cached ones.
#[derive(Debug)]
pub struct LrukReplacer {
    node_store: HashMap<FrameId, LrukNode>,
    history_queue: LinkedHashMap<FrameId, ()>,
    cache_queue: LinkedHashMap<FrameId, ()>,
    evictable_size: usize, // Number of evictable nodes
    current_timestamp: u64,
    k: usize, // Number of accesses to track
}

impl LrukReplacer {
    /// Creates a new LRU-K replacer instance.
    pub fn new(k: usize) -> Self {
        assert!(k > 0, "LRU-K needs k >= 1");
        LrukReplacer {
            node_store: HashMap::new(),
            history_queue: LinkedHashMap::new(),
            cache_queue: LinkedHashMap::new(),
            evictable_size: 0,
            current_timestamp: 0,
            k,
        }
    }

    /// Increments and returns the current timestamp.
    fn advance_timestamp(&mut self) -> u64 {
        let old_timestamp = self.current_timestamp;
        self.current_timestamp += 1;
        old_timestamp
    }

    /// Drops every trace of a tracked frame. The caller adjusts `evictable_size`.
    fn discard_node(&mut self, frame_id: FrameId) {
        self.history_queue.remove(&frame_id);
        self.cache_queue.remove(&frame_id);
        self.node_store.remove(&frame_id);
    }
}

impl Replacer for LrukReplacer {
    /// Records access to a frame and updates its history.
    fn record_access(&mut self, frame_id: FrameId) {
        let timestamp = self.advance_timestamp();
        match self.node_store.get_mut(&frame_id) {
            None => {
                let mut node = LrukNode::new(self.k);
                node.insert_history_timestamp(timestamp);
                if node.has_inf_backward_k_dist() {
                    self.history_queue.insert(frame_id, ());
                } else {
                    // k == 1: a single access already fills the history
                    self.cache_queue.insert(frame_id, ());
                }
                self.node_store.insert(frame_id, node);
            }
            Some(node) => {
                node.insert_history_timestamp(timestamp);
                if node.has_inf_backward_k_dist() {
                    // Still short of K accesses; keeps its first-access position.
                } else if self.history_queue.remove(&frame_id).is_some() {
                    // K-th access: promote from the history queue to the cache queue.
                    self.cache_queue.insert(frame_id, ());
                } else {
                    // Already cached: move to the most-recently-used end.
                    self.cache_queue.remove(&frame_id);
                    self.cache_queue.insert(frame_id, ());
                }
            }
        }
    }

    /// Flags a frame's evictability, adjusting the evictable count only on
    /// actual transitions. Untracked frames are ignored.
    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        let Some(node) = self.node_store.get_mut(&frame_id) else {
            return;
        };
        if node.is_evictable != evictable {
            node.is_evictable = evictable;
            if evictable {
                self.evictable_size += 1;
            } else {
                self.evictable_size -= 1;
            }
        }
    }

    /// Evicts the evictable frame with the largest backward K-distance:
    /// the oldest history-queue frame if any is evictable, otherwise the
    /// front-most evictable cache-queue frame.
    fn evict(&mut self) -> Option<FrameId> {
        if self.evictable_size == 0 {
            return None;
        }

        let target = self
            .history_queue
            .keys()
            .chain(self.cache_queue.keys())
            .copied()
            .find(|frame_id| self.node_store[frame_id].is_evictable)?;

        self.discard_node(target);
        self.evictable_size -= 1;
        trace!(frame_id = target, "evicted frame");
        Some(target)
    }

    /// Removes a frame from the replacer. Panics if the frame is tracked but
    /// not evictable; removing an untracked frame is a no-op.
    fn remove(&mut self, frame_id: FrameId) {
        let Some(node) = self.node_store.get(&frame_id) else {
            return;
        };
        assert!(
            node.is_evictable,
            "cannot remove non-evictable frame {} from the replacer",
            frame_id
        );
        self.discard_node(frame_id);
        self.evictable_size -= 1;
    }

    /// Returns the number of evictable frames.
    fn evictable_count(&self) -> usize {
        self.evictable_size
    }
}
