//! Request extractors that sit between axum's primitives and the
//! negotiation/ACL layer.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::StatusCode;

/// The connecting peer's IP address (design §4.2's ACL check input).
///
/// Resolved from axum's `ConnectInfo<SocketAddr>`, which requires the
/// server to be bound via `into_make_service_with_connect_info`
/// ([`crate::server::Server::serve`] does this). Reverse-proxy forwarding
/// headers (`X-Forwarded-For`) are intentionally not trusted here: this
/// reference server has no configured trusted-proxy list to validate them
/// against, so honoring them would let any client spoof its own ACL check.
pub struct PeerAddr(pub IpAddr);

impl<S: Send + Sync> FromRequestParts<S> for PeerAddr {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| Self(addr.ip()))
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "server is missing connect-info middleware"))
    }
}
