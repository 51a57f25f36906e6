//! The negotiation + dispatch route (design §4.1/§4.6): every request that
//! is not one of the admin endpoints lands here, regardless of method or
//! path shape, since the mode/qid/format grammar lives entirely in the
//! path and headers rather than in axum's router.

use std::collections::HashMap;

use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;

use qbridge_core::{negotiate, DispatchOutcome, Executor, Headers as CoreHeaders, RawRequest as CoreRawRequest, ResponseHeaders};
use qbridge_error::BridgeError;

use crate::extractors::PeerAddr;
use crate::state::AppState;

pub async fn query_handler<E: Executor>(
    State(state): State<AppState<E>>,
    PeerAddr(peer): PeerAddr,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let body_text = (method == Method::POST).then(|| std::str::from_utf8(&body).ok()).flatten();

    let mut core_headers = CoreHeaders::new();
    for (name, value) in &headers {
        if let Ok(value) = value.to_str() {
            core_headers.insert(name.as_str(), value.to_string());
        }
    }

    let raw = CoreRawRequest {
        path: uri.path(),
        params: &params,
        headers: &core_headers,
        body_query: body_text,
        default_format: state.config.default_format,
        default_compression: state.config.default_compression,
    };

    let negotiated = match negotiate(&state.config.normalized_context(), &raw) {
        Ok(req) => req,
        Err(err) => return strip_body_for_head(BridgeError::BadRequest(err.to_string()).into_response(), &method),
    };

    state.metrics.record_mode(negotiated.mode);

    let auth = if negotiated.mode.requires_auth() {
        let result = state.acl_cache.authorize(&negotiated.token, peer).await;
        if result.is_ok() {
            state.metrics.record_acl_hit();
        } else {
            state.metrics.record_acl_miss();
        }
        result
    } else {
        Ok(())
    };

    let response = match state.dispatcher.dispatch(negotiated, auth).await {
        Ok(outcome) => render_outcome(&state, outcome).await,
        Err(err) => {
            state.metrics.record_error();
            err.into_response()
        }
    };
    strip_body_for_head(response, &method)
}

async fn render_outcome<E: Executor>(state: &AppState<E>, outcome: DispatchOutcome) -> Response {
    match outcome {
        DispatchOutcome::ResultUrl(url) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], url).into_response()
        }
        DispatchOutcome::Redirect(url) => Response::builder()
            .status(StatusCode::FOUND)
            .header(header::LOCATION, url)
            .body(Body::empty())
            .expect("redirect response built from a well-formed URL string is always valid"),
        DispatchOutcome::Conflict => StatusCode::NO_CONTENT.into_response(),
        DispatchOutcome::Stream { format, compression, rows, warnings, serde_config } => {
            for warning in warnings {
                tracing::debug!(%warning, "backend warning");
            }
            let response_headers = ResponseHeaders::for_format(format, compression);
            let (writer, reader) = tokio::io::duplex(64 * 1024);
            let registry = state.codec_registry.clone();
            tokio::spawn(async move {
                if let Err(err) =
                    qbridge_core::write_response(&registry, format, compression, &rows, &serde_config, writer).await
                {
                    tracing::error!(error = %err, "response stream truncated after opening");
                }
            });
            let mut builder = Response::builder().status(StatusCode::OK).header(header::CONTENT_TYPE, response_headers.content_type);
            if let Some(encoding) = response_headers.content_encoding {
                builder = builder.header(header::CONTENT_ENCODING, encoding);
            }
            builder
                .body(Body::from_stream(ReaderStream::new(reader)))
                .expect("streamed response built from known-valid header values is always valid")
        }
    }
}

/// HTTP requires a `HEAD` response to carry the same status/headers as the
/// matching `GET` with an empty body; axum's router does this for `GET`
/// routes registered via `get()`, but [`query_handler`] is reached through
/// `fallback` for every method, so the drop has to happen here.
fn strip_body_for_head(response: Response, method: &Method) -> Response {
    if *method != Method::HEAD {
        return response;
    }
    let (parts, _) = response.into_parts();
    Response::from_parts(parts, Body::empty())
}
