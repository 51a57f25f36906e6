//! Mode Dispatcher (design §4.6): the five-plus-one execution modes and
//! their interaction with the query cache and the executor.

use std::sync::Arc;
use std::time::{Duration, Instant};

use qbridge_error::{AclError, BridgeError};
use qbridge_wire::{Compression, Format, ResultSet};
use uuid::Uuid;

use crate::error_cache::ErrorCache;
use crate::executor::{ExecResult, Executor, Outcome};
use crate::mode::Mode;
use crate::query_cache::QueryCache;
use crate::query_info::{QueryInfo, ResultHandle};
use crate::request::NegotiatedRequest;

/// Statement delimiter for batch mode (design §4.6): `--;; <name>\n`.
const BATCH_DELIMITER_PREFIX: &str = "--;;";

/// What the Response Writer needs to render (design §4.6's response
/// column). `Stream` carries a fully materialized [`ResultSet`] — see
/// `PgExecutor`'s doc comment for why this reference implementation
/// collects rather than streams row-by-row.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// `SUBMIT`/`ASYNC`: `200 text/plain` body = result URL.
    ResultUrl(String),
    /// `REDIRECT`: `302 Location: <result URL>`.
    Redirect(String),
    /// `DIRECT`/`MUTATION`/`BATCH`: stream the encoded result.
    Stream {
        format: Format,
        compression: Compression,
        rows: ResultSet,
        warnings: Vec<String>,
        serde_config: std::collections::BTreeMap<String, String>,
    },
    /// Another consumer is already draining this qid's live result.
    Conflict,
}

pub struct Dispatcher<E: Executor> {
    executor: Arc<E>,
    query_cache: Arc<QueryCache>,
    error_cache: Arc<ErrorCache>,
    server_url: String,
    request_timeout: Option<Duration>,
}

impl<E: Executor> Dispatcher<E> {
    pub fn new(
        executor: Arc<E>,
        query_cache: Arc<QueryCache>,
        error_cache: Arc<ErrorCache>,
        server_url: impl Into<String>,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self { executor, query_cache, error_cache, server_url: server_url.into(), request_timeout }
    }

    /// Runs one negotiated request to completion. `auth` is the ACL
    /// decision the caller already made (design §4.2 happens upstream of
    /// the dispatcher, in `qbridge-auth`); modes that require
    /// authorization (everything but `SUBMIT`/`REDIRECT`) propagate its
    /// failure as `Unauthorized` before touching the cache or executor.
    pub async fn dispatch(
        &self,
        mut req: NegotiatedRequest,
        auth: Result<(), AclError>,
    ) -> Result<DispatchOutcome, BridgeError> {
        if req.mode.requires_auth() {
            auth?;
        }

        if req.qid.is_empty() {
            req.qid = Uuid::new_v4().to_string();
        }

        match req.mode {
            Mode::Submit => self.submit(req),
            Mode::Redirect => self.redirect(req),
            Mode::Async => self.async_submit(req).await,
            Mode::Direct | Mode::Mutation => self.direct_or_mutation(req).await,
            Mode::Batch => self.batch(req).await,
        }
    }

    fn result_url(&self, qid: &str, format: Format, compression: Compression) -> String {
        let mut url = format!("{}/{}.{}", self.server_url.trim_end_matches('/'), qid, format.file_extension());
        if let Some(ext) = compression.file_extension() {
            url.push('.');
            url.push_str(ext);
        }
        url
    }

    fn submit(&self, req: NegotiatedRequest) -> Result<DispatchOutcome, BridgeError> {
        let url = self.result_url(&req.qid, req.format, req.compression);
        self.query_cache.insert(Arc::new(self.pending_query_info(&req)));
        Ok(DispatchOutcome::ResultUrl(url))
    }

    fn redirect(&self, req: NegotiatedRequest) -> Result<DispatchOutcome, BridgeError> {
        let url = self.result_url(&req.qid, req.format, req.compression);
        self.query_cache.insert(Arc::new(self.pending_query_info(&req)));
        Ok(DispatchOutcome::Redirect(url))
    }

    async fn async_submit(&self, req: NegotiatedRequest) -> Result<DispatchOutcome, BridgeError> {
        let url = self.result_url(&req.qid, req.format, req.compression);
        match self.executor.execute(&req.query, req.tenant.as_deref(), req.txid.as_deref()).await {
            Ok(result) => {
                let info = self.pending_query_info(&req);
                info.set_result(to_handle(result));
                self.query_cache.insert(Arc::new(info));
                Ok(DispatchOutcome::ResultUrl(url))
            }
            Err(err) => {
                self.error_cache.put(req.qid.clone(), err.to_string());
                Err(err)
            }
        }
    }

    async fn direct_or_mutation(&self, req: NegotiatedRequest) -> Result<DispatchOutcome, BridgeError> {
        if let Some(cached) = self.query_cache.get(&req.qid) {
            if cached.has_result() {
                return self.drain_cached(&req.qid, &cached, req.serde_config.clone()).await;
            }
            // Submitted earlier, not yet executed (state = 0): run it now,
            // merging in the query/txid/tenant the original submit carried
            // since a bare fetch-by-qid supplies none of its own (design
            // §4.1 step 9).
            let mut req = req;
            if req.query.is_empty() {
                req.query = cached.query.clone();
            }
            if req.txid.is_none() {
                req.txid = cached.txid.clone();
            }
            if req.tenant.is_none() {
                req.tenant = cached.tenant.clone();
            }
            return self.execute_and_stream(req, true).await;
        }

        if req.query.is_empty() {
            return Err(BridgeError::NotFound { qid: req.qid });
        }
        self.execute_and_stream(req, false).await
    }

    async fn drain_cached(
        &self,
        qid: &str,
        info: &Arc<QueryInfo>,
        serde_config: std::collections::BTreeMap<String, String>,
    ) -> Result<DispatchOutcome, BridgeError> {
        if !info.try_acquire_active() {
            return Ok(DispatchOutcome::Conflict);
        }
        let handle = info.take_result().expect("has_result() was true under the active guard");
        self.query_cache.invalidate(qid);
        let rows = handle.rows.clone();
        let warnings = handle.warnings.clone();
        handle.close();
        info.release_active();
        Ok(DispatchOutcome::Stream { format: info.format, compression: info.compression, rows, warnings, serde_config })
    }

    async fn execute_and_stream(&self, req: NegotiatedRequest, overshoot_candidate: bool) -> Result<DispatchOutcome, BridgeError> {
        let started = Instant::now();
        match self.executor.execute(&req.query, req.tenant.as_deref(), req.txid.as_deref()).await {
            Ok(result) => {
                let overshot = overshoot_candidate
                    && self.request_timeout.is_some_and(|ttl| started.elapsed() > ttl);
                if overshot {
                    tracing::debug!(qid = %req.qid, "direct execution overshot the cache TTL; re-putting a fresh entry");
                    self.query_cache.invalidate(&req.qid);
                    let info = self.pending_query_info(&req);
                    self.query_cache.insert(Arc::new(info));
                }
                let (rows, warnings) = match result.outcome {
                    Outcome::Rows(rows) => (rows, result.warnings),
                    Outcome::UpdateCount(count) => (update_count_result(count), result.warnings),
                };
                Ok(DispatchOutcome::Stream {
                    format: req.format,
                    compression: req.compression,
                    rows,
                    warnings,
                    serde_config: req.serde_config,
                })
            }
            Err(err) => {
                self.query_cache.invalidate(&req.qid);
                Err(err)
            }
        }
    }

    /// Batch semantics (design §4.6): statements separated by
    /// `--;; <name>\n` run in order on the executor; every result but the
    /// last is discarded (its warnings are logged, not propagated — design
    /// §9's open question resolves this as "log, don't surface"); a
    /// mid-batch failure aborts and yields an error.
    async fn batch(&self, req: NegotiatedRequest) -> Result<DispatchOutcome, BridgeError> {
        let statements = split_batch(&req.query);
        if statements.is_empty() {
            return Err(BridgeError::BadRequest("batch request has no statements".to_string()));
        }

        let mut last: Option<ExecResult> = None;
        let total = statements.len();
        for (index, (name, sql)) in statements.into_iter().enumerate() {
            let result = self.executor.execute(&sql, req.tenant.as_deref(), req.txid.as_deref()).await.map_err(|err| {
                tracing::warn!(%name, statement_index = index, "batch aborted mid-way");
                err
            })?;
            if index + 1 < total {
                for warning in &result.warnings {
                    tracing::debug!(%name, %warning, "discarding warning from non-final batch statement");
                }
            } else {
                last = Some(result);
            }
        }

        let result = last.expect("loop ran at least once since statements is non-empty");
        let (rows, warnings) = match result.outcome {
            Outcome::Rows(rows) => (rows, result.warnings),
            Outcome::UpdateCount(count) => (update_count_result(count), result.warnings),
        };
        Ok(DispatchOutcome::Stream {
            format: req.format,
            compression: req.compression,
            rows,
            warnings,
            serde_config: req.serde_config,
        })
    }

    fn pending_query_info(&self, req: &NegotiatedRequest) -> QueryInfo {
        QueryInfo::new(
            req.qid.clone(),
            req.query.clone(),
            req.txid.clone(),
            req.format,
            req.compression,
            req.token.clone(),
            req.tenant.clone(),
            req.user.clone(),
            req.client.clone(),
        )
    }
}

fn to_handle(result: ExecResult) -> ResultHandle {
    match result.outcome {
        Outcome::Rows(rows) => ResultHandle::from_materialized(rows, result.warnings),
        Outcome::UpdateCount(count) => ResultHandle::from_materialized(update_count_result(count), result.warnings),
    }
}

fn update_count_result(count: u64) -> ResultSet {
    use qbridge_wire::{ColumnMeta, TypeInfo, Value};
    let mut rs = ResultSet::new(vec![ColumnMeta { name: "update_count".to_string(), type_info: TypeInfo::default() }]);
    rs.push_row(vec![Value::Int64(i64::try_from(count).unwrap_or(i64::MAX))]);
    rs
}

fn split_batch(query: &str) -> Vec<(String, String)> {
    if !query.contains(BATCH_DELIMITER_PREFIX) {
        return if query.trim().is_empty() { Vec::new() } else { vec![("_".to_string(), query.to_string())] };
    }
    let mut statements = Vec::new();
    let mut current_name: Option<String> = None;
    let mut current_sql = String::new();
    for line in query.lines() {
        if let Some(rest) = line.strip_prefix(BATCH_DELIMITER_PREFIX) {
            if let Some(name) = current_name.take() {
                statements.push((name, current_sql.trim().to_string()));
                current_sql.clear();
            }
            current_name = Some(rest.trim().to_string());
        } else if current_name.is_some() {
            current_sql.push_str(line);
            current_sql.push('\n');
        }
    }
    if let Some(name) = current_name {
        statements.push((name, current_sql.trim().to_string()));
    }
    statements.into_iter().filter(|(_, sql)| !sql.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::test_support::ScriptedExecutor;
    use qbridge_wire::{ColumnMeta, Value};

    fn dispatcher_with(executor: ScriptedExecutor) -> Dispatcher<ScriptedExecutor> {
        Dispatcher::new(
            Arc::new(executor),
            Arc::new(QueryCache::new(100, None)),
            Arc::new(ErrorCache::new(100)),
            "http://host",
            Some(Duration::from_secs(10)),
        )
    }

    fn req(mode: Mode, qid: &str, query: &str) -> NegotiatedRequest {
        NegotiatedRequest {
            qid: qid.to_string(),
            has_explicit_qid: !qid.is_empty(),
            mode,
            mode_was_explicit: true,
            format: Format::Csv,
            compression: Compression::None,
            query: query.to_string(),
            txid: None,
            tenant: None,
            user: None,
            client: None,
            token: "tok".to_string(),
            serde_config: std::collections::BTreeMap::new(),
        }
    }

    fn single_row_result() -> ExecResult {
        let mut rows = ResultSet::new(vec![ColumnMeta { name: "x".into(), type_info: qbridge_wire::TypeInfo::default() }]);
        rows.push_row(vec![Value::Int32(1)]);
        ExecResult { outcome: Outcome::Rows(rows), warnings: Vec::new() }
    }

    #[tokio::test]
    async fn submit_returns_url_and_populates_cache_without_executing() {
        let dispatcher = dispatcher_with(ScriptedExecutor::new(vec![]));
        let outcome = dispatcher.dispatch(req(Mode::Submit, "q1", "SELECT 1"), Ok(())).await.unwrap();
        assert!(matches!(outcome, DispatchOutcome::ResultUrl(url) if url == "http://host/q1.csv"));
    }

    #[tokio::test]
    async fn redirect_returns_redirect_url() {
        let dispatcher = dispatcher_with(ScriptedExecutor::new(vec![]));
        let outcome = dispatcher.dispatch(req(Mode::Redirect, "q1", "SELECT 1"), Ok(())).await.unwrap();
        assert!(matches!(outcome, DispatchOutcome::Redirect(url) if url == "http://host/q1.csv"));
    }

    #[tokio::test]
    async fn async_then_direct_drains_cached_result_without_re_executing() {
        let dispatcher = dispatcher_with(ScriptedExecutor::new(vec![Ok(single_row_result())]));
        let url = dispatcher.dispatch(req(Mode::Async, "q1", "SELECT 1"), Ok(())).await.unwrap();
        assert!(matches!(url, DispatchOutcome::ResultUrl(_)));

        let outcome = dispatcher.dispatch(req(Mode::Direct, "q1", ""), Ok(())).await.unwrap();
        match outcome {
            DispatchOutcome::Stream { rows, .. } => assert_eq!(rows.rows.len(), 1),
            other => panic!("expected Stream, got {other:?}"),
        }

        // Second direct GET after drain: qid no longer cached, empty query -> not found.
        let second = dispatcher.dispatch(req(Mode::Direct, "q1", ""), Ok(())).await;
        assert!(matches!(second, Err(BridgeError::NotFound { .. })));
    }

    #[tokio::test]
    async fn direct_with_unauthorized_acl_is_rejected_before_touching_executor() {
        let dispatcher = dispatcher_with(ScriptedExecutor::new(vec![]));
        let denied = Err(AclError::PeerNotAllowed { peer: "1.2.3.4".to_string() });
        let outcome = dispatcher.dispatch(req(Mode::Direct, "q1", "SELECT 1"), denied).await;
        assert!(matches!(outcome, Err(BridgeError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn batch_streams_only_the_last_statements_result() {
        let create = ExecResult { outcome: Outcome::UpdateCount(0), warnings: Vec::new() };
        let dispatcher = dispatcher_with(ScriptedExecutor::new(vec![Ok(create), Ok(single_row_result())]));
        let body = "--;; a\nCREATE TABLE t(x INT)\n--;; b\nSELECT 1 AS x\n";
        let outcome = dispatcher.dispatch(req(Mode::Batch, "", body), Ok(())).await.unwrap();
        match outcome {
            DispatchOutcome::Stream { rows, .. } => {
                assert_eq!(rows.rows.len(), 1);
                assert_eq!(rows.columns[0].name, "x");
            }
            other => panic!("expected Stream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn batch_failure_midway_aborts() {
        let dispatcher = dispatcher_with(ScriptedExecutor::new(vec![Err("boom".to_string())]));
        let body = "--;; a\nCREATE TABLE t(x INT)\n--;; b\nSELECT 1\n";
        let outcome = dispatcher.dispatch(req(Mode::Batch, "", body), Ok(())).await;
        assert!(matches!(outcome, Err(BridgeError::Backend { .. })));
    }

    #[tokio::test]
    async fn async_failure_populates_error_cache() {
        let dispatcher = dispatcher_with(ScriptedExecutor::new(vec![Err("backend exploded".to_string())]));
        let outcome = dispatcher.dispatch(req(Mode::Async, "q1", "SELECT 1"), Ok(())).await;
        assert!(outcome.is_err());
        assert_eq!(dispatcher.error_cache.get("q1").as_deref(), Some("backend exploded"));
    }

    #[tokio::test]
    async fn direct_fetch_by_qid_alone_reuses_the_submitted_query_text() {
        let dispatcher = dispatcher_with(ScriptedExecutor::new(vec![Ok(single_row_result())]));
        dispatcher.dispatch(req(Mode::Submit, "q1", "SELECT 1"), Ok(())).await.unwrap();
        let outcome = dispatcher.dispatch(req(Mode::Direct, "q1", ""), Ok(())).await.unwrap();
        assert!(matches!(outcome, DispatchOutcome::Stream { .. }));
    }

    #[tokio::test]
    async fn direct_with_no_cache_entry_and_inline_query_executes_fresh() {
        let dispatcher = dispatcher_with(ScriptedExecutor::new(vec![Ok(single_row_result())]));
        let outcome = dispatcher.dispatch(req(Mode::Direct, "fresh", "SELECT 1"), Ok(())).await.unwrap();
        assert!(matches!(outcome, DispatchOutcome::Stream { .. }));
    }
}
