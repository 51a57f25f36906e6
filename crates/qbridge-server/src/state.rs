//! Shared application state (design §2): every collaborator an axum
//! handler needs, behind `Arc` so cloning the state per-request is cheap.

use std::sync::Arc;

use qbridge_auth::AclCache;
use qbridge_config::InMemoryConfig;
use qbridge_core::{Dispatcher, Executor, ErrorCache, Metrics, QueryCache};
use qbridge_wire::CodecRegistry;

use crate::config::ServerConfig;

/// Everything a route handler needs, cloned (cheaply, via `Arc`) into axum's
/// `State` extractor. `InMemoryConfig` plays two collaborator roles at once
/// (design §3's `NamedConfig` and `TokenVerifier`) — sharing one instance
/// between `acl_cache` and `named_config` is why it's wrapped in its own
/// `Arc` rather than owned by either.
pub struct AppState<E: Executor> {
    pub config: Arc<ServerConfig>,
    pub dispatcher: Arc<Dispatcher<E>>,
    pub acl_cache: Arc<AclCache<Arc<InMemoryConfig>>>,
    pub named_config: Arc<InMemoryConfig>,
    pub codec_registry: Arc<CodecRegistry>,
    pub metrics: Arc<Metrics>,
    pub query_cache: Arc<QueryCache>,
    pub error_cache: Arc<ErrorCache>,
}

impl<E: Executor> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            dispatcher: self.dispatcher.clone(),
            acl_cache: self.acl_cache.clone(),
            named_config: self.named_config.clone(),
            codec_registry: self.codec_registry.clone(),
            metrics: self.metrics.clone(),
            query_cache: self.query_cache.clone(),
            error_cache: self.error_cache.clone(),
        }
    }
}
