use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use crate::query_cache::DEFAULT_MAX_ENTRIES;

/// Bounded `qid → errorMessage` map, populated only on async-mode failures
/// (design §4.4). No TTL is required, only a size bound, since a failed
/// async submission is a terminal state a client either fetches once via
/// `GET error/<qid>` or never fetches at all.
pub struct ErrorCache {
    entries: Mutex<LruCache<String, String>>,
}

impl ErrorCache {
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::new(1).expect("1 is non-zero"));
        Self { entries: Mutex::new(LruCache::new(capacity)) }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES as usize)
    }

    pub fn put(&self, qid: impl Into<String>, message: impl Into<String>) {
        self.entries.lock().put(qid.into(), message.into());
    }

    pub fn get(&self, qid: &str) -> Option<String> {
        self.entries.lock().get(qid).cloned()
    }

    pub fn entry_count(&self) -> u64 {
        self.entries.lock().len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let cache = ErrorCache::new(4);
        cache.put("q1", "backend exploded");
        assert_eq!(cache.get("q1").as_deref(), Some("backend exploded"));
    }

    #[test]
    fn missing_qid_is_none() {
        let cache = ErrorCache::new(4);
        assert_eq!(cache.get("nope"), None);
    }
}
