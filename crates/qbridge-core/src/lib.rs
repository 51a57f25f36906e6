//! The request lifecycle engine (design §2): negotiation, the query and
//! error caches, the executor contract, the mode dispatcher, the response
//! writer, and admin endpoint logic. This is "the core" of the query
//! bridge — everything else in the workspace is a collaborator it treats
//! as an interface (`qbridge-auth`'s ACL cache, `qbridge-config`'s
//! `NamedConfig`, `qbridge-wire`'s `Serde`/`Format`/`Compression`).

// Accessors on QueryInfo/QueryCache/NegotiatedRequest are self-explanatory
// field getters; doc comments live on the types and the non-obvious methods.
#![allow(missing_docs)]

mod admin;
mod dispatcher;
mod error_cache;
mod executor;
mod metrics;
mod mode;
mod negotiation;
mod pg_executor;
mod query_cache;
mod query_info;
mod request;
mod response;

pub use admin::{
    config_detail_response, config_entry_response, encrypt_secrets, is_database_extension, lookup_error,
    register_secrets, ConfigEntryResponse, DbProbeInfo, ServerConfigSummary, ENCRYPTED_SUFFIX,
};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error_cache::ErrorCache;
pub use executor::{ExecResult, Executor, Outcome};
pub use metrics::Metrics;
pub use mode::Mode;
pub use negotiation::{decode_authorization, negotiate, Headers, NegotiationError, RawRequest};
pub use pg_executor::PgExecutor;
pub use query_cache::QueryCache;
pub use query_info::{QueryInfo, ResultHandle};
pub use request::NegotiatedRequest;
pub use response::{write_response, ResponseHeaders, WriteError};
