//! Counters backing `GET {ctx}metrics` (design §4.8). spec.md scopes out
//! "metrics framework choice", not the endpoint itself, so this is a small
//! atomic counter set rendered in Prometheus text exposition format
//! rather than a stub.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::mode::Mode;

#[derive(Default)]
pub struct Metrics {
    submit: AtomicU64,
    redirect: AtomicU64,
    r#async: AtomicU64,
    direct: AtomicU64,
    mutation: AtomicU64,
    batch: AtomicU64,
    acl_hits: AtomicU64,
    acl_misses: AtomicU64,
    errors: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_mode(&self, mode: Mode) {
        let counter = match mode {
            Mode::Submit => &self.submit,
            Mode::Redirect => &self.redirect,
            Mode::Async => &self.r#async,
            Mode::Direct => &self.direct,
            Mode::Mutation => &self.mutation,
            Mode::Batch => &self.batch,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_acl_hit(&self) {
        self.acl_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_acl_miss(&self) {
        self.acl_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Renders the Prometheus text exposition format for the current
    /// counter values plus the two cache sizes the admin endpoint is
    /// required to report (design §4.8).
    pub fn render(&self, query_cache_entries: u64, error_cache_entries: u64) -> String {
        let load = Ordering::Relaxed;
        let mut out = String::new();
        out.push_str("# HELP qbridge_requests_total Requests handled, by mode.\n");
        out.push_str("# TYPE qbridge_requests_total counter\n");
        for (mode, counter) in [
            ("submit", &self.submit),
            ("redirect", &self.redirect),
            ("async", &self.r#async),
            ("direct", &self.direct),
            ("mutation", &self.mutation),
            ("batch", &self.batch),
        ] {
            out.push_str(&format!("qbridge_requests_total{{mode=\"{mode}\"}} {}\n", counter.load(load)));
        }
        out.push_str("# HELP qbridge_acl_cache_total ACL cache lookups, by outcome.\n");
        out.push_str("# TYPE qbridge_acl_cache_total counter\n");
        out.push_str(&format!("qbridge_acl_cache_total{{outcome=\"hit\"}} {}\n", self.acl_hits.load(load)));
        out.push_str(&format!("qbridge_acl_cache_total{{outcome=\"miss\"}} {}\n", self.acl_misses.load(load)));
        out.push_str("# HELP qbridge_errors_total Requests that ended in an error response.\n");
        out.push_str("# TYPE qbridge_errors_total counter\n");
        out.push_str(&format!("qbridge_errors_total {}\n", self.errors.load(load)));
        out.push_str("# HELP qbridge_query_cache_entries Live entries in the query cache.\n");
        out.push_str("# TYPE qbridge_query_cache_entries gauge\n");
        out.push_str(&format!("qbridge_query_cache_entries {query_cache_entries}\n"));
        out.push_str("# HELP qbridge_error_cache_entries Live entries in the error cache.\n");
        out.push_str("# TYPE qbridge_error_cache_entries gauge\n");
        out.push_str(&format!("qbridge_error_cache_entries {error_cache_entries}\n"));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_every_mode_and_the_cache_gauges() {
        let metrics = Metrics::new();
        metrics.record_mode(Mode::Submit);
        metrics.record_mode(Mode::Direct);
        metrics.record_acl_hit();
        let text = metrics.render(3, 1);
        assert!(text.contains("mode=\"submit\"} 1"));
        assert!(text.contains("mode=\"direct\"} 1"));
        assert!(text.contains("qbridge_query_cache_entries 3"));
        assert!(text.contains("qbridge_error_cache_entries 1"));
    }
}
