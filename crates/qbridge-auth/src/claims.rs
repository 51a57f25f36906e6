use std::collections::HashSet;
use std::net::IpAddr;

use async_trait::async_trait;
use serde::Deserialize;

/// Claims extracted from a verified bearer token. Only the fields the ACL
/// cache cares about are modeled here; a real `NamedConfig.verifyToken`
/// implementation may decode a much larger claim set upstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub allowed_hosts: HashSet<String>,
    #[serde(default)]
    pub allowed_ips: HashSet<IpAddr>,
    #[serde(default)]
    pub allowed_cidrs: Vec<String>,
}

/// Contract the named-configuration-manager collaborator must satisfy
/// (design §3, `NamedConfig.verifyToken`). Returns `None` when the token
/// cannot be verified at all — the ACL cache treats that the same as "no
/// claims", i.e. deny.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify_token(&self, audience: &str, token: &str) -> Option<Claims>;
}

#[async_trait]
impl<T: TokenVerifier + ?Sized> TokenVerifier for std::sync::Arc<T> {
    async fn verify_token(&self, audience: &str, token: &str) -> Option<Claims> {
        T::verify_token(self, audience, token).await
    }
}
