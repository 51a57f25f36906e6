//! Executor contract (design §4.5): acquire a pooled connection, run a
//! statement, and hand back either a streamed result or an update count,
//! plus any backend warnings.

use async_trait::async_trait;
use qbridge_error::BridgeError;
use qbridge_wire::ResultSet;

/// What running a statement produced. `Rows` corresponds to
/// `isResultSet == true` in design §4.5; `UpdateCount` to `false`.
#[derive(Debug, Clone)]
pub enum Outcome {
    Rows(ResultSet),
    UpdateCount(u64),
}

/// What the executor returns on success: the outcome plus any warnings the
/// backend raised while producing it (design §4.5 — captured and logged,
/// never surfaced as an error).
#[derive(Debug, Clone)]
pub struct ExecResult {
    pub outcome: Outcome,
    pub warnings: Vec<String>,
}

/// The driver/dialect seam the core treats as an abstract collaborator
/// (design §1: "the concrete JDBC-like driver layer... treated as an
/// abstract `Executor`/`Dialect` interface pair"). Implementations own
/// connection acquisition and are expected to be cheap to clone/share.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Executes `query` against the backend, optionally pinning `tenant`
    /// to the task's context so the driver can scope secrets (design
    /// §4.5). `txid` is passed through opaquely for backend correlation.
    async fn execute(
        &self,
        query: &str,
        tenant: Option<&str>,
        txid: Option<&str>,
    ) -> Result<ExecResult, BridgeError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Scripted executor used across the dispatcher's unit tests: returns
    /// one queued [`ExecResult`] (or the configured failure) per call, in
    /// order, so batch semantics (one statement per `execute` call) and
    /// failure-midway aborts are exercised precisely.
    pub struct ScriptedExecutor {
        pub responses: parking_lot::Mutex<Vec<Result<ExecResult, String>>>,
    }

    impl ScriptedExecutor {
        pub fn new(responses: Vec<Result<ExecResult, String>>) -> Self {
            Self { responses: parking_lot::Mutex::new(responses) }
        }
    }

    #[async_trait]
    impl Executor for ScriptedExecutor {
        async fn execute(
            &self,
            _query: &str,
            _tenant: Option<&str>,
            _txid: Option<&str>,
        ) -> Result<ExecResult, BridgeError> {
            let mut responses = self.responses.lock();
            if responses.is_empty() {
                return Err(BridgeError::backend("no more scripted responses"));
            }
            match responses.remove(0) {
                Ok(result) => Ok(result),
                Err(message) => Err(BridgeError::backend(message)),
            }
        }
    }
}
