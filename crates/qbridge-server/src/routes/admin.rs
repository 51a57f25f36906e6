//! Admin endpoints (design §4.8): server config summary, named-config
//! introspection, metrics, secret encryption, and async-error lookup.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use qbridge_config::NamedConfig;
use qbridge_core::{
    config_detail_response, config_entry_response, decode_authorization, encrypt_secrets, lookup_error,
    register_secrets, Executor, ServerConfigSummary,
};
use qbridge_error::BridgeError;

use crate::extractors::PeerAddr;
use crate::state::AppState;

fn bearer_token(headers: &HeaderMap) -> String {
    decode_authorization(headers.get("authorization").and_then(|v| v.to_str().ok()))
}

async fn require_auth<E: Executor>(state: &AppState<E>, headers: &HeaderMap, peer: std::net::IpAddr) -> Result<(), BridgeError> {
    state.acl_cache.authorize(&bearer_token(headers), peer).await.map_err(Into::into)
}

pub async fn config_summary_handler<E: Executor>(State(state): State<AppState<E>>) -> Response {
    let summary = ServerConfigSummary {
        server_url: state.config.effective_server_url(),
        auth_enabled: state.config.auth,
        tag: state.config.tag.clone(),
        default_format: state.config.default_format,
        default_compression: state.config.default_compression,
    };
    (StatusCode::OK, [("content-type", "text/plain")], summary.render()).into_response()
}

pub async fn metrics_handler<E: Executor>(State(state): State<AppState<E>>) -> Response {
    let text = state.metrics.render(state.query_cache.entry_count(), state.error_cache.entry_count());
    (StatusCode::OK, [("content-type", "text/plain; version=0.0.4")], text).into_response()
}

pub async fn config_category_handler<E: Executor>(State(state): State<AppState<E>>, Path(extension): Path<String>) -> Response {
    Json(state.named_config.get_all_ids(&extension)).into_response()
}

pub async fn config_entry_handler<E: Executor>(
    State(state): State<AppState<E>>,
    Path((extension, id)): Path<(String, String)>,
) -> Response {
    // Live database probing (design §4.8) requires the driver layer the
    // executor is generic over; this reference server always renders the
    // entry without it, so `config/<db-ext>/<id>` omits `product`/`currentDB`.
    match config_entry_response(state.named_config.as_ref(), &extension, &id, None) {
        Ok(entry) => Json(entry).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn config_detail_handler<E: Executor>(
    State(state): State<AppState<E>>,
    Path((extension, id, detail)): Path<(String, String, String)>,
) -> Response {
    match config_detail_response(state.named_config.as_ref(), &extension, &id, &detail) {
        Ok(value) => Json(value).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn encrypt_handler<E: Executor>(
    State(state): State<AppState<E>>,
    PeerAddr(peer): PeerAddr,
    headers: HeaderMap,
    Json(secrets): Json<BTreeMap<String, String>>,
) -> Response {
    if let Err(err) = require_auth(&state, &headers, peer).await {
        return err.into_response();
    }
    let tenant = headers.get("tenant").and_then(|v| v.to_str().ok()).unwrap_or_default();
    match encrypt_secrets(state.named_config.as_ref(), tenant, &state.config.secrets_salt, secrets) {
        Ok(encrypted) => Json(encrypted).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn register_handler<E: Executor>(
    State(state): State<AppState<E>>,
    PeerAddr(peer): PeerAddr,
    headers: HeaderMap,
    Json(encrypted): Json<BTreeMap<String, String>>,
) -> Response {
    if let Err(err) = require_auth(&state, &headers, peer).await {
        return err.into_response();
    }
    let tenant = headers.get("tenant").and_then(|v| v.to_str().ok()).unwrap_or_default();
    match register_secrets(state.named_config.as_ref(), tenant, &state.config.secrets_salt, encrypted) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn error_handler<E: Executor>(State(state): State<AppState<E>>, Path(qid): Path<String>) -> Response {
    match lookup_error(&state.error_cache, &qid) {
        Some(message) => (StatusCode::OK, [("content-type", "text/plain")], message).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
