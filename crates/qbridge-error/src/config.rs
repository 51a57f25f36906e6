#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no configuration registered for {category}/{id}")]
    NotFound { category: String, id: String },

    #[error("tenant is required for {operation}")]
    MissingTenant { operation: String },

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),
}

impl ConfigError {
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "config_not_found",
            Self::MissingTenant { .. } => "missing_tenant",
            Self::Encryption(_) => "encryption_failed",
            Self::Decryption(_) => "decryption_failed",
        }
    }
}
