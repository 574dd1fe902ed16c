//! Bounded word-description cache with insertion-order eviction.
//!
//! Documents repeat words constantly; lemmatizing each occurrence from
//! scratch would dominate indexing time. This cache maps the UTF-8 bytes
//! of a word to its finished description.
//!
//! Eviction is strictly by *first insertion*: lookups go through
//! [`lru::LruCache::peek`], which does not refresh an entry, and inserts
//! go through `push`, so the underlying LRU order degenerates to a FIFO.
//! Once `capacity` entries are stored, pushing a new key evicts the
//! oldest-inserted one and hands it back to the caller.

use std::num::NonZeroUsize;

use lru::LruCache;

/// A cached description: the rewritten form of one word plus a flag
/// recording whether lemmatization produced nothing and the surface form
/// alone was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedDescription {
    pub text: String,
    pub imitation: bool,
}

#[derive(Debug)]
pub struct DescriptionCache {
    entries: LruCache<Vec<u8>, CachedDescription>,
}

impl DescriptionCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Look up a word without refreshing its position in the eviction order.
    pub fn get(&self, word: &[u8]) -> Option<&CachedDescription> {
        self.entries.peek(word)
    }

    /// Insert a description, returning the evicted oldest entry when the
    /// capacity bound was hit. Keys are expected to be fresh; re-inserting
    /// an existing key would refresh its slot.
    pub fn insert(
        &mut self,
        word: Vec<u8>,
        description: CachedDescription,
    ) -> Option<(Vec<u8>, CachedDescription)> {
        self.entries.push(word, description)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
