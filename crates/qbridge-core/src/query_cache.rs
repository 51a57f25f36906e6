use std::sync::Arc;
use std::time::Duration;

use moka::notification::RemovalCause;
use moka::sync::Cache;

use crate::query_info::QueryInfo;

/// Default `maxEntries` / `serverRequestLimit` (design §4.3).
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;
/// Default write-time TTL in milliseconds (design §4.3, `requestTimeout`).
pub const DEFAULT_TTL_MS: u64 = 10_000;

/// Bounded TTL store of live [`QueryInfo`] entries, keyed by `qid` (design
/// §4.3). Owns the backend resources its entries hold: the eviction
/// callback closes a result's handles unless the entry is `active`, in
/// which case the draining writer is responsible for the close.
#[derive(Clone)]
pub struct QueryCache {
    cache: Cache<String, Arc<QueryInfo>>,
}

impl QueryCache {
    /// `ttl = None` or a non-positive duration disables expiry, matching
    /// the source's "zero or negative ⇒ no expiry" rule.
    pub fn new(max_entries: u64, ttl: Option<Duration>) -> Self {
        let mut builder = Cache::builder().max_capacity(max_entries).eviction_listener(on_evict);
        if let Some(ttl) = ttl.filter(|d| !d.is_zero()) {
            builder = builder.time_to_live(ttl);
        }
        Self { cache: builder.build() }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, Some(Duration::from_millis(DEFAULT_TTL_MS)))
    }

    pub fn insert(&self, info: Arc<QueryInfo>) {
        self.cache.insert(info.qid.clone(), info);
    }

    pub fn get(&self, qid: &str) -> Option<Arc<QueryInfo>> {
        self.cache.get(qid)
    }

    /// Explicit removal on failure (design §7 propagation policy) or when a
    /// re-submit replaces an existing `qid`. Runs the same eviction
    /// callback as TTL/size-based removal.
    pub fn invalidate(&self, qid: &str) {
        self.cache.invalidate(qid);
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

fn on_evict(qid: Arc<String>, info: Arc<QueryInfo>, cause: RemovalCause) {
    if info.is_active() {
        tracing::debug!(%qid, ?cause, "query cache entry evicted while its result is actively draining; skipping close");
        return;
    }
    if let Some(handle) = info.take_result() {
        tracing::debug!(%qid, ?cause, "closing idle result handle on eviction");
        handle.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qbridge_wire::Format;

    fn sample_info(qid: &str) -> Arc<QueryInfo> {
        Arc::new(QueryInfo::new(qid, "SELECT 1", None, Format::Csv, qbridge_wire::Compression::None, "tok", None, None, None))
    }

    #[test]
    fn insert_then_get_round_trips() {
        let cache = QueryCache::new(10, None);
        let info = sample_info("q1");
        cache.insert(info.clone());
        assert!(cache.get("q1").is_some());
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = QueryCache::new(10, None);
        cache.insert(sample_info("q1"));
        cache.invalidate("q1");
        cache.cache.run_pending_tasks();
        assert!(cache.get("q1").is_none());
    }

    #[test]
    fn eviction_skips_close_while_active() {
        let cache = QueryCache::new(1, None);
        let info = sample_info("q1");
        assert!(info.try_acquire_active());
        cache.insert(info.clone());
        cache.insert(sample_info("q2"));
        cache.cache.run_pending_tasks();
        assert!(info.is_active());
    }
}
