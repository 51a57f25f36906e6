use std::net::IpAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use qbridge_error::AclError;

use crate::acl::ServerAcl;
use crate::claims::TokenVerifier;

const DEFAULT_CAPACITY: usize = 4096;

/// Bounded LRU of per-token [`ServerAcl`]s, keyed by the raw bearer token
/// (design §4.2). Verification (decoding the token into [`Claims`](crate::Claims))
/// happens at most once per token per cache generation; every subsequent
/// `authorize` call on a cached token only pays for the host/IP check.
pub struct AclCache<V> {
    verifier: V,
    audience: String,
    entries: Mutex<LruCache<String, Arc<ServerAcl>>>,
    auth_disabled: bool,
}

impl<V: TokenVerifier> AclCache<V> {
    pub fn new(verifier: V, audience: impl Into<String>) -> Self {
        Self::with_capacity(verifier, audience, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(verifier: V, audience: impl Into<String>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(DEFAULT_CAPACITY).expect("DEFAULT_CAPACITY is non-zero"));
        Self {
            verifier,
            audience: audience.into(),
            entries: Mutex::new(LruCache::new(capacity)),
            auth_disabled: false,
        }
    }

    /// Builds a cache that never checks tokens at all — the bridge's
    /// `--no-auth` escape hatch. Every `authorize` call succeeds.
    pub fn disabled(verifier: V, audience: impl Into<String>) -> Self {
        let mut cache = Self::new(verifier, audience);
        cache.auth_disabled = true;
        cache
    }

    /// Checks that `token` grants access to `peer` (design §4.2):
    /// auth-disabled short-circuits to allow, an empty token is always
    /// denied, an unverifiable token is denied, and otherwise the
    /// (possibly cached) [`ServerAcl`] decides.
    pub async fn authorize(&self, token: &str, peer: IpAddr) -> Result<(), AclError> {
        self.authorize_with_hostname(token, peer, None).await
    }

    pub async fn authorize_with_hostname(
        &self,
        token: &str,
        peer: IpAddr,
        peer_hostname: Option<&str>,
    ) -> Result<(), AclError> {
        if self.auth_disabled {
            return Ok(());
        }
        if token.is_empty() {
            tracing::debug!("rejecting request with empty bearer token");
            return Err(AclError::TokenMissing);
        }

        if let Some(acl) = self.entries.lock().get(token).cloned() {
            return Self::check(&acl, peer, peer_hostname);
        }

        let claims = self
            .verifier
            .verify_token(&self.audience, token)
            .await
            .ok_or(AclError::TokenUnverifiable)?;
        let acl = Arc::new(ServerAcl::from_claims(&claims));
        self.entries.lock().put(token.to_string(), acl.clone());
        Self::check(&acl, peer, peer_hostname)
    }

    fn check(acl: &ServerAcl, peer: IpAddr, peer_hostname: Option<&str>) -> Result<(), AclError> {
        if acl.is_valid(peer, peer_hostname) {
            Ok(())
        } else {
            Err(AclError::PeerNotAllowed { peer: peer.to_string() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::Claims;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingVerifier {
        calls: AtomicUsize,
        claims: Claims,
    }

    #[async_trait]
    impl TokenVerifier for CountingVerifier {
        async fn verify_token(&self, _audience: &str, token: &str) -> Option<Claims> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if token == "valid" {
                Some(self.claims.clone())
            } else {
                None
            }
        }
    }

    #[tokio::test]
    async fn empty_token_is_denied_without_calling_verifier() {
        let verifier = CountingVerifier { calls: AtomicUsize::new(0), claims: Claims::default() };
        let cache = AclCache::new(verifier, "aud");
        let result = cache.authorize("", "1.2.3.4".parse().unwrap()).await;
        assert!(matches!(result, Err(AclError::TokenMissing)));
        assert_eq!(cache.verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unverifiable_token_is_denied() {
        let verifier = CountingVerifier { calls: AtomicUsize::new(0), claims: Claims::default() };
        let cache = AclCache::new(verifier, "aud");
        let result = cache.authorize("bogus", "1.2.3.4".parse().unwrap()).await;
        assert!(matches!(result, Err(AclError::TokenUnverifiable)));
    }

    #[tokio::test]
    async fn disabled_cache_always_allows() {
        let verifier = CountingVerifier { calls: AtomicUsize::new(0), claims: Claims::default() };
        let cache = AclCache::disabled(verifier, "aud");
        let result = cache.authorize("", "1.2.3.4".parse().unwrap()).await;
        assert!(result.is_ok());
        assert_eq!(cache.verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn verified_token_is_memoized_after_first_call() {
        let verifier = CountingVerifier { calls: AtomicUsize::new(0), claims: Claims::default() };
        let cache = AclCache::new(verifier, "aud");
        let peer: IpAddr = "1.2.3.4".parse().unwrap();
        assert!(cache.authorize("valid", peer).await.is_ok());
        assert!(cache.authorize("valid", peer).await.is_ok());
        assert_eq!(cache.verifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn denied_peer_reports_peer_not_allowed() {
        let claims = Claims { sub: "u".into(), allowed_ips: ["9.9.9.9".parse().unwrap()].into(), ..Default::default() };
        let verifier = CountingVerifier { calls: AtomicUsize::new(0), claims };
        let cache = AclCache::new(verifier, "aud");
        let result = cache.authorize("valid", "1.2.3.4".parse().unwrap()).await;
        assert!(matches!(result, Err(AclError::PeerNotAllowed { .. })));
    }
}
