//! Copy-on-write versioned trie over byte-string keys, plus a concurrent
//! store that publishes trie snapshots to readers.
mod trie;
mod trie_store;

pub use trie::Trie;
pub use trie_store::{TrieStore, ValueGuard};
