//! Unified error taxonomy for the query bridge core and its collaborators.
//!
//! All crates in this workspace depend on this crate for error handling so
//! that the mode dispatcher can make a single, consistent status-code and
//! cache-side-effect decision regardless of which component raised the error.

// Error variants and fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

mod auth;
mod config;
#[cfg(feature = "axum-compat")]
mod http;

pub use auth::AclError;
pub use config::ConfigError;
#[cfg(feature = "axum-compat")]
pub use http::ErrorResponse;

/// Top-level error kind, mirroring the taxonomy in the error handling design:
/// each variant maps to exactly one HTTP status and one cache side-effect.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Unknown mode, malformed context prefix, missing tenant on encrypt/register.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Token missing, unverifiable, or peer not covered by the ACL.
    #[error(transparent)]
    Unauthorized(#[from] AclError),

    /// `qid` absent from the query cache, or its entry already expired.
    #[error("no such query: {qid}")]
    NotFound { qid: String },

    /// Direct pull of a `qid` whose live result is already being drained by
    /// another consumer.
    #[error("result already draining: {qid}")]
    Conflict { qid: String },

    /// The executor or the underlying driver raised while running a statement.
    #[error("backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The codec or compression writer failed mid-stream, after the response
    /// had already been opened.
    #[error("transport error: {0}")]
    Transport(String),

    /// A collaborator (`NamedConfig`, encryption, …) failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BridgeError {
    /// Stable machine-readable error code, used in plain-text admin bodies
    /// and in log lines.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Backend { .. } => "backend_error",
            Self::Transport(_) => "transport_error",
            Self::Config(_) => "config_error",
        }
    }

    /// True when this error should cause the mode dispatcher to invalidate
    /// the cached `QueryInfo` for the request's `qid` (section 7 propagation
    /// policy: backend and transport errors invalidate, the rest do not).
    pub const fn invalidates_cache(&self) -> bool {
        matches!(self, Self::Backend { .. } | Self::Transport(_))
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend { message: message.into(), source: None }
    }

    pub fn backend_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend { message: message.into(), source: Some(Box::new(source)) }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
