//! Server configuration (design §5/§9): bind address, context prefix,
//! negotiation defaults, and the timeout/limit knobs the dispatcher and
//! executor enforce. `qbridge-cli` layers CLI flags and environment
//! variables over a TOML file shaped like this struct; this crate only
//! cares about the resolved values.

use std::net::SocketAddr;

use qbridge_wire::{Compression, Format};
use serde::{Deserialize, Serialize};

fn default_bind_addr() -> SocketAddr {
    "127.0.0.1:8089".parse().expect("hardcoded default bind address is valid")
}

fn default_context() -> String {
    "/".to_string()
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_query_timeout_ms() -> u64 {
    30_000
}

fn default_server_request_limit() -> u64 {
    10 * 1024 * 1024
}

fn default_tag() -> String {
    "qbridge".to_string()
}

/// Server configuration (design §5/§9's TOML schema).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds.
    pub bind_addr: SocketAddr,

    /// Path prefix every request must carry (design §4.1 step 1).
    /// Always rendered with a trailing slash internally.
    pub context: String,

    /// Default format when negotiation finds no header/param/extension hint.
    pub default_format: Format,

    /// Default compression when negotiation finds no header/param/extension hint.
    pub default_compression: Compression,

    /// `false` runs the bridge with ACL checks disabled (design §4.2's
    /// `--no-auth` escape hatch).
    pub auth: bool,

    /// Maximum accepted request body size, in bytes.
    pub server_request_limit: u64,

    /// How long `DIRECT`/`MUTATION` waits for the statement to complete
    /// before re-queuing the request behind a fresh cache entry (design
    /// §4.6's overshoot handling).
    pub request_timeout_ms: u64,

    /// Per-statement timeout enforced by the executor (design §5).
    pub query_timeout_ms: u64,

    /// Base URL embedded in `SUBMIT`/`ASYNC`/`REDIRECT` result URLs.
    /// Defaults to `http://<bind_addr>` when left empty.
    pub server_url: String,

    /// Free-form label surfaced by `GET {ctx}config` (design §4.8).
    pub tag: String,

    /// Salt mixed into the tenant-scoped secret encryption key (design
    /// §4.8's `encrypt`/`register`). A real deployment should set this from
    /// a secret store rather than the checked-in default.
    pub secrets_salt: String,

    /// Enables `tower_http`'s request/response tracing layer.
    pub tracing_enabled: bool,

    /// Enables a permissive CORS layer, for browser-based clients.
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            context: default_context(),
            default_format: Format::Csv,
            default_compression: Compression::None,
            auth: default_true(),
            server_request_limit: default_server_request_limit(),
            request_timeout_ms: default_request_timeout_ms(),
            query_timeout_ms: default_query_timeout_ms(),
            server_url: String::new(),
            tag: default_tag(),
            secrets_salt: "qbridge".to_string(),
            tracing_enabled: true,
            cors_enabled: false,
        }
    }
}

impl ServerConfig {
    /// The `server_url` to embed in result URLs: the configured value, or a
    /// same-origin guess from `bind_addr` when left unset.
    pub fn effective_server_url(&self) -> String {
        if self.server_url.is_empty() {
            format!("http://{}", self.bind_addr)
        } else {
            self.server_url.trim_end_matches('/').to_string()
        }
    }

    /// `context`, normalized to always start and end with `/`.
    pub fn normalized_context(&self) -> String {
        let trimmed = self.context.trim_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{trimmed}/")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_a_trailing_slash_context() {
        let config = ServerConfig::default();
        assert_eq!(config.normalized_context(), "/");
    }

    #[test]
    fn custom_context_is_normalized_both_sides() {
        let config = ServerConfig { context: "bridge".to_string(), ..ServerConfig::default() };
        assert_eq!(config.normalized_context(), "/bridge/");
    }

    #[test]
    fn empty_server_url_falls_back_to_bind_addr() {
        let config = ServerConfig { server_url: String::new(), ..ServerConfig::default() };
        assert_eq!(config.effective_server_url(), format!("http://{}", config.bind_addr));
    }
}
