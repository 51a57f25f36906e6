//! Axum HTTP binding for the query bridge (design §2/§6): turns an
//! `Executor` and a `NamedConfig` store into a running server by wiring
//! them through `qbridge-core`'s negotiation, dispatch, and response
//! writer. Everything protocol-shaped (modes, caches, the wire format
//! table) lives in `qbridge-core`; this crate only owns routing,
//! extraction, and the serve loop.

// Route handlers and state fields are plumbing named after the endpoint or
// collaborator they bind; doc comments live on the types and logic they wrap.
#![allow(missing_docs)]

pub mod config;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use server::Server;
pub use state::AppState;

/// Server-level error: everything that can go wrong before a request ever
/// reaches negotiation.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind server: {0}")]
    Bind(String),

    #[error("server runtime error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
