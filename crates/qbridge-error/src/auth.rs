#[derive(Debug, thiserror::Error)]
pub enum AclError {
    #[error("bearer token missing")]
    TokenMissing,

    #[error("token could not be verified")]
    TokenUnverifiable,

    #[error("peer {peer} is not covered by the token's host/IP allowlist")]
    PeerNotAllowed { peer: String },
}

impl AclError {
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::TokenMissing => "token_missing",
            Self::TokenUnverifiable => "token_unverifiable",
            Self::PeerNotAllowed { .. } => "peer_not_allowed",
        }
    }
}
