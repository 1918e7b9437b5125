use std::any::Any;
use std::ops::Deref;
use std::sync::{Arc, Mutex};

use crate::trie::Trie;

/// Handle returned by [`TrieStore::get`].
///
/// Besides the value itself, the guard retains the trie version the value
/// was read from, so the reference stays valid however many new roots
/// writers publish afterwards.
pub struct ValueGuard<T> {
    _root: Trie,
    value: Arc<T>,
}

impl<T> ValueGuard<T> {
    fn new(root: Trie, value: Arc<T>) -> Self {
        ValueGuard { _root: root, value }
    }
}

impl<T> Deref for ValueGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// Single-writer, many-reader wrapper around a [`Trie`].
///
/// Two locks with a strict order: `write_lock` (outermost) serializes
/// mutating operations, `root` (innermost) covers only loads and stores of
/// the current root handle. Readers take the root lock just long enough to
/// copy the handle, then walk their snapshot without any lock held.
#[derive(Default)]
pub struct TrieStore {
    root: Mutex<Trie>,
    write_lock: Mutex<()>,
}

impl TrieStore {
    pub fn new() -> Self {
        TrieStore {
            root: Mutex::new(Trie::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Looks up `key` in the current version of the trie.
    ///
    /// Returns `None` when the key is absent or the stored value is not a
    /// `T`; otherwise a guard that keeps the observed version alive.
    pub fn get<T: Any + Send + Sync>(&self, key: &[u8]) -> Option<ValueGuard<T>> {
        let root = self.root.lock().unwrap().clone();
        let value = root.value_ref(key)?;
        let value = value.downcast::<T>().ok()?;
        Some(ValueGuard::new(root, value))
    }

    /// Stores `value` under `key`. Writers are serialized; readers are only
    /// blocked for the root swap.
    pub fn put<T: Any + Send + Sync>(&self, key: &[u8], value: T) {
        let _write = self.write_lock.lock().unwrap();

        let root = self.root.lock().unwrap().clone();
        let new_root = root.put(key, value);
        *self.root.lock().unwrap() = new_root;
    }

    /// Removes the value under `key`, if any.
    pub fn remove(&self, key: &[u8]) {
        let _write = self.write_lock.lock().unwrap();

        let root = self.root.lock().unwrap().clone();
        let new_root = root.remove(key);
        *self.root.lock().unwrap() = new_root;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_trie_store_basic() {
        let store = TrieStore::new();
        assert!(store.get::<u32>(b"k").is_none());

        store.put(b"k", 7u32);
        let guard = store.get::<u32>(b"k").expect("value present");
        assert_eq!(*guard, 7);

        store.remove(b"k");
        assert!(store.get::<u32>(b"k").is_none());
    }

    #[test]
    fn test_trie_store_type_mismatch() {
        let store = TrieStore::new();
        store.put(b"k", String::from("seven"));
        assert!(store.get::<u32>(b"k").is_none());
        assert_eq!(store.get::<String>(b"k").as_deref(), Some(&String::from("seven")));
    }

    #[test]
    fn test_trie_store_guard_outlives_later_writes() {
        let store = TrieStore::new();
        store.put(b"stable", 1u32);

        let guard = store.get::<u32>(b"stable").expect("value present");

        // Later writes publish new roots; the guard still reads its snapshot.
        for i in 0..100u32 {
            store.put(i.to_be_bytes().as_slice(), i);
        }
        store.remove(b"stable");

        assert_eq!(*guard, 1);
        assert!(store.get::<u32>(b"stable").is_none());
    }

    #[test]
    fn test_trie_store_concurrent_readers_and_writer() {
        const KEYS: u32 = 512;
        let store = Arc::new(TrieStore::new());

        let writer_store = Arc::clone(&store);
        let writer = thread::spawn(move || {
            for i in 0..KEYS {
                writer_store.put(i.to_be_bytes().as_slice(), i);
            }
        });

        let mut readers = Vec::new();
        for _ in 0..4 {
            let reader_store = Arc::clone(&store);
            readers.push(thread::spawn(move || {
                for i in 0..KEYS {
                    // A read either misses (not yet written) or sees exactly
                    // the value put under that key; never a partial update.
                    if let Some(guard) = reader_store.get::<u32>(i.to_be_bytes().as_slice()) {
                        assert_eq!(*guard, i);
                    }
                }
            }));
        }

        writer.join().expect("writer panicked");
        for reader in readers {
            reader.join().expect("reader panicked");
        }

        // After the writer finishes, every key is visible.
        for i in 0..KEYS {
            let guard = store
                .get::<u32>(i.to_be_bytes().as_slice())
                .expect("all keys written");
            assert_eq!(*guard, i);
        }
    }

    #[test]
    fn test_trie_store_serialized_writers() {
        const PER_WRITER: u32 = 200;
        let store = Arc::new(TrieStore::new());

        let mut writers = Vec::new();
        for w in 0..4u32 {
            let store = Arc::clone(&store);
            writers.push(thread::spawn(move || {
                for i in 0..PER_WRITER {
                    let key = [w.to_be_bytes(), i.to_be_bytes()].concat();
                    store.put(&key, (w, i));
                }
            }));
        }
        for writer in writers {
            writer.join().expect("writer panicked");
        }

        // No writer's updates were lost to a concurrent root swap.
        for w in 0..4u32 {
            for i in 0..PER_WRITER {
                let key = [w.to_be_bytes(), i.to_be_bytes()].concat();
                let guard = store.get::<(u32, u32)>(&key).expect("key written");
                assert_eq!(*guard, (w, i));
            }
        }
    }
}
