//! HTTP server implementation.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use qbridge_auth::AclCache;
use qbridge_config::InMemoryConfig;
use qbridge_core::{Dispatcher, ErrorCache, Executor, Metrics, QueryCache};
use qbridge_wire::CodecRegistry;

use crate::config::ServerConfig;
use crate::middleware::{cors_layer, trace_layer};
use crate::routes::{
    config_category_handler, config_detail_handler, config_entry_handler, config_summary_handler, encrypt_handler,
    error_handler, metrics_handler, query_handler, register_handler,
};
use crate::state::AppState;
use crate::{Result, ServerError};

/// Query bridge HTTP server, generic over the backend [`Executor`].
pub struct Server<E: Executor> {
    config: Arc<ServerConfig>,
    state: AppState<E>,
}

impl<E: Executor + 'static> Server<E> {
    /// Builds a server from its config, a ready executor, and the shared
    /// named-configuration store (design §3's `NamedConfig`/`TokenVerifier`
    /// collaborator). The query cache, error cache, metrics, codec
    /// registry, ACL cache, and dispatcher are all internal wiring this
    /// constructor owns.
    pub fn new(config: ServerConfig, executor: Arc<E>, named_config: Arc<InMemoryConfig>) -> Self {
        let config = Arc::new(config);
        let query_cache = Arc::new(QueryCache::with_defaults());
        let error_cache = Arc::new(ErrorCache::with_defaults());
        let dispatcher = Arc::new(Dispatcher::new(
            executor,
            query_cache.clone(),
            error_cache.clone(),
            config.effective_server_url(),
            Some(Duration::from_millis(config.request_timeout_ms)),
        ));
        let acl_cache = if config.auth {
            AclCache::new(named_config.clone(), config.tag.clone())
        } else {
            AclCache::disabled(named_config.clone(), config.tag.clone())
        };

        let state = AppState {
            config: config.clone(),
            dispatcher,
            acl_cache: Arc::new(acl_cache),
            named_config,
            codec_registry: Arc::new(CodecRegistry::default()),
            metrics: Arc::new(Metrics::new()),
            query_cache,
            error_cache,
        };

        Self { config, state }
    }

    /// Builds the axum `Router`, with middleware layered per config. Public
    /// so integration tests (and embedders that want their own listener
    /// loop) can drive it directly with `tower::ServiceExt::oneshot`
    /// instead of going through [`Server::serve`]'s `TcpListener`.
    pub fn router(&self) -> Router {
        let ctx = self.config.normalized_context();
        let trimmed = ctx.trim_end_matches('/');

        let mut app = Router::new()
            .route(&format!("{trimmed}/config"), get(config_summary_handler::<E>))
            .route(&format!("{trimmed}/config/{{extension}}"), get(config_category_handler::<E>))
            .route(&format!("{trimmed}/config/{{extension}}/{{id}}"), get(config_entry_handler::<E>))
            .route(&format!("{trimmed}/config/{{extension}}/{{id}}/{{detail}}"), get(config_detail_handler::<E>))
            .route(&format!("{trimmed}/metrics"), get(metrics_handler::<E>))
            .route(&format!("{trimmed}/encrypt"), post(encrypt_handler::<E>))
            .route(&format!("{trimmed}/register"), post(register_handler::<E>))
            .route(&format!("{trimmed}/error/{{qid}}"), get(error_handler::<E>))
            .fallback(query_handler::<E>)
            .with_state(self.state.clone());

        if self.config.tracing_enabled {
            app = app.layer(trace_layer());
        }
        if self.config.cors_enabled {
            app = app.layer(cors_layer());
        }

        app
    }

    /// Binds and serves until the process is killed or `axum::serve`
    /// returns an error. Peer addresses reach [`crate::extractors::PeerAddr`]
    /// via `into_make_service_with_connect_info`.
    pub async fn serve(self) -> Result<()> {
        let app = self.router();

        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        info!(bind_addr = %self.config.bind_addr, context = %self.config.normalized_context(), "query bridge listening");

        axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>())
            .await
            .map_err(ServerError::Io)?;

        Ok(())
    }
}
