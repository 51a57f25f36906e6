use async_trait::async_trait;
use qbridge_auth::{Claims, TokenVerifier};

use crate::memory::InMemoryConfig;

/// `NamedConfig.verifyToken(audience, token)` (design §3) — the in-memory
/// store treats `audience` as informational only and looks tokens up by
/// value. A real implementation would validate signature and audience
/// before returning claims.
#[async_trait]
impl TokenVerifier for InMemoryConfig {
    async fn verify_token(&self, _audience: &str, token: &str) -> Option<Claims> {
        self.lookup_claims(token)
    }
}
