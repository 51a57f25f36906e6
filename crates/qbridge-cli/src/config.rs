//! TOML config-file schema (design §9.3) and its translation into the
//! runtime `ServerConfig` + `InMemoryConfig` the server needs to start.

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use qbridge_auth::Claims;
use qbridge_config::{ConfigEntry, InMemoryConfig};
use qbridge_server::ServerConfig;
use qbridge_wire::{Compression, Format};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },

    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, #[source] source: toml::de::Error },
}

/// One row of the `[[named_config]]` array (design §9.3): a connection
/// descriptor or similar entry registered into `InMemoryConfig` at
/// startup.
#[derive(Debug, Deserialize)]
pub struct NamedConfigEntry {
    pub category: String,
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// One row of the `[[token]]` array: a bearer token and the ACL claims it
/// verifies to.
#[derive(Debug, Deserialize)]
pub struct TokenEntry {
    pub token: String,
    pub sub: String,
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
    #[serde(default)]
    pub allowed_ips: Vec<IpAddr>,
    #[serde(default)]
    pub allowed_cidrs: Vec<String>,
}

/// The on-disk shape `qbridge-cli` loads, one-to-one with
/// [`qbridge_server::ServerConfig`] plus the database connection and the
/// `named_config`/`token` seed arrays the core has no opinion about.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub bind_addr: SocketAddr,
    pub context: String,
    pub default_format: Format,
    pub default_compression: Compression,
    pub auth: bool,
    pub server_request_limit: u64,
    pub request_timeout_ms: u64,
    pub query_timeout_ms: u64,
    pub server_url: String,
    pub tag: String,
    pub secrets_salt: String,
    pub tracing_enabled: bool,
    pub cors_enabled: bool,
    pub database_url: String,
    pub pool_max_size: usize,
    pub named_config: Vec<NamedConfigEntry>,
    pub token: Vec<TokenEntry>,
}

impl Default for FileConfig {
    fn default() -> Self {
        let server = ServerConfig::default();
        Self {
            bind_addr: server.bind_addr,
            context: server.context,
            default_format: server.default_format,
            default_compression: server.default_compression,
            auth: server.auth,
            server_request_limit: server.server_request_limit,
            request_timeout_ms: server.request_timeout_ms,
            query_timeout_ms: server.query_timeout_ms,
            server_url: server.server_url,
            tag: server.tag,
            secrets_salt: server.secrets_salt,
            tracing_enabled: server.tracing_enabled,
            cors_enabled: server.cors_enabled,
            database_url: String::new(),
            pool_max_size: 10,
            named_config: Vec::new(),
            token: Vec::new(),
        }
    }
}

impl FileConfig {
    /// Reads and parses `path` into a [`FileConfig`].
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigLoadError::Read { path: path.display().to_string(), source })?;
        toml::from_str(&text).map_err(|source| ConfigLoadError::Parse { path: path.display().to_string(), source })
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind_addr,
            context: self.context.clone(),
            default_format: self.default_format,
            default_compression: self.default_compression,
            auth: self.auth,
            server_request_limit: self.server_request_limit,
            request_timeout_ms: self.request_timeout_ms,
            query_timeout_ms: self.query_timeout_ms,
            server_url: self.server_url.clone(),
            tag: self.tag.clone(),
            secrets_salt: self.secrets_salt.clone(),
            tracing_enabled: self.tracing_enabled,
            cors_enabled: self.cors_enabled,
        }
    }

    /// Builds the seeded [`InMemoryConfig`] the server shares as both its
    /// `NamedConfig` and its `TokenVerifier` (design §3).
    pub fn named_config(&self) -> InMemoryConfig {
        let config = InMemoryConfig::new();
        for entry in &self.named_config {
            let mut config_entry = ConfigEntry::new(entry.id.clone(), entry.description.clone());
            for (key, value) in &entry.properties {
                config_entry = config_entry.with_property(key.clone(), value.clone());
            }
            config.put_entry(entry.category.clone(), config_entry);
        }
        for entry in &self.token {
            let claims = Claims {
                sub: entry.sub.clone(),
                allowed_hosts: entry.allowed_hosts.iter().cloned().collect(),
                allowed_ips: entry.allowed_ips.iter().copied().collect(),
                allowed_cidrs: entry.allowed_cidrs.clone(),
            };
            config.put_token(entry.token.clone(), claims);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qbridge_config::NamedConfig;

    #[test]
    fn missing_fields_fall_back_to_server_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.bind_addr, ServerConfig::default().bind_addr);
        assert!(config.named_config.is_empty());
        assert!(config.token.is_empty());
    }

    #[test]
    fn named_config_and_token_rows_populate_the_store() {
        let toml = r#"
            [[named_config]]
            category = "db"
            id = "primary"
            description = "primary database"
            properties = { host = "localhost", port = "5432" }

            [[token]]
            token = "secret"
            sub = "svc-a"
            allowed_ips = ["10.0.0.5"]
        "#;
        let config: FileConfig = toml::from_str(toml).unwrap();
        let named_config = config.named_config();
        let ids = named_config.get_all_ids("db");
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].id, "primary");
    }

    #[test]
    fn unreadable_path_is_a_read_error() {
        let result = FileConfig::load(Path::new("/does/not/exist.toml"));
        assert!(matches!(result, Err(ConfigLoadError::Read { .. })));
    }
}
