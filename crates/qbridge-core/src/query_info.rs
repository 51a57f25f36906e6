use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use qbridge_wire::{Compression, Format, ResultSet};

/// The live backend handles a successful query owns until closed (design
/// §3: "cursor, statement, connection" triple). The pool guard is kept
/// behind `Option` so `close` can take it and let it drop exactly once.
pub struct ResultHandle {
    pub rows: ResultSet,
    pub warnings: Vec<String>,
    connection: Option<deadpool_postgres::Object>,
}

impl ResultHandle {
    pub fn new(rows: ResultSet, warnings: Vec<String>, connection: deadpool_postgres::Object) -> Self {
        Self { rows, warnings, connection: Some(connection) }
    }

    /// Builds a handle for an [`Executor`](crate::Executor) that already
    /// materializes the full result set and returns its pooled connection
    /// before handing the rows back (the reference `PgExecutor` does this:
    /// there is no live cursor left to own). `close` on such a handle is
    /// then just dropping the buffered rows.
    pub fn from_materialized(rows: ResultSet, warnings: Vec<String>) -> Self {
        Self { rows, warnings, connection: None }
    }

    /// Closes cursor, statement, and connection by dropping the pool guard.
    /// `deadpool` returns the underlying connection to the pool on drop, so
    /// this is the entire "close in that order" contract for our
    /// materialized-result design (design §9: driver cursor details are an
    /// external collaborator's concern).
    pub fn close(mut self) {
        self.connection.take();
    }
}

struct Inner {
    result: Option<ResultHandle>,
    error: Option<String>,
}

/// The central entity: one per live or pending query (design §3).
///
/// `result` and `error` are mutually exclusive; setting one clears the
/// other. `active` gates eviction-time close: a writer currently draining
/// the result sets it, so the query-cache eviction callback skips closing
/// handles still in use.
pub struct QueryInfo {
    pub qid: String,
    pub query: String,
    pub txid: Option<String>,
    pub format: Format,
    pub compression: Compression,
    pub token: String,
    pub tenant: Option<String>,
    pub user: Option<String>,
    pub client: Option<String>,
    pub created_at: Instant,
    inner: Mutex<Inner>,
    active: AtomicBool,
}

impl QueryInfo {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        qid: impl Into<String>,
        query: impl Into<String>,
        txid: Option<String>,
        format: Format,
        compression: Compression,
        token: impl Into<String>,
        tenant: Option<String>,
        user: Option<String>,
        client: Option<String>,
    ) -> Self {
        Self {
            qid: qid.into(),
            query: query.into(),
            txid,
            format,
            compression,
            token: token.into(),
            tenant,
            user,
            client,
            created_at: Instant::now(),
            inner: Mutex::new(Inner { result: None, error: None }),
            active: AtomicBool::new(false),
        }
    }

    pub fn set_result(&self, handle: ResultHandle) {
        let mut inner = self.inner.lock();
        inner.error = None;
        inner.result = Some(handle);
    }

    pub fn set_error(&self, message: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.result = None;
        inner.error = Some(message.into());
    }

    pub fn has_result(&self) -> bool {
        self.inner.lock().result.is_some()
    }

    pub fn error(&self) -> Option<String> {
        self.inner.lock().error.clone()
    }

    /// Takes ownership of the live result, leaving the slot empty. Used by
    /// the direct-mode drain path and by the eviction callback.
    pub fn take_result(&self) -> Option<ResultHandle> {
        self.inner.lock().result.take()
    }

    /// Compare-and-set `active` false → true. Returns `true` iff this
    /// caller won the race and may now drain the result exclusively.
    pub fn try_acquire_active(&self) -> bool {
        self.active.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok()
    }

    pub fn release_active(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}
