//! Admin endpoint logic (design §4.8). Pure functions over the
//! [`NamedConfig`] collaborator and the two caches; `qbridge-server` only
//! adds the axum routing and JSON/plain-text response wrapping.

use std::collections::BTreeMap;

use qbridge_config::NamedConfig;
use qbridge_error::{BridgeError, ConfigError};
use qbridge_wire::{Compression, Format};
use serde::Serialize;

use crate::error_cache::ErrorCache;

/// Suffix appended to a secret's key once `encrypt` has processed it
/// (design §4.8: "`<key><encryptedSuffix> = encrypt(value, tenant)`").
pub const ENCRYPTED_SUFFIX: &str = ".encrypted";

/// `GET {ctx}config` response body (design §4.8): plain-text properties.
#[derive(Debug, Clone)]
pub struct ServerConfigSummary {
    pub server_url: String,
    pub auth_enabled: bool,
    pub tag: String,
    pub default_format: Format,
    pub default_compression: Compression,
}

impl ServerConfigSummary {
    pub fn render(&self) -> String {
        format!(
            "serverUrl={}\nauth={}\ntag={}\nformat={}\ncompression={}\n",
            self.server_url,
            self.auth_enabled,
            self.tag,
            self.default_format.file_extension(),
            self.default_compression.encoding_token().unwrap_or("none"),
        )
    }
}

/// Extension categories whose `config/<ext>/<id>` response is enriched
/// with live database metadata (design §4.8: "populated only if extension
/// is a database-style one").
pub fn is_database_extension(extension: &str) -> bool {
    matches!(extension, "db" | "sql")
}

/// Metadata obtained by opening a probe connection, for database-style
/// extensions. Populating this is the caller's job (it requires the
/// executor/driver layer); admin logic here only shapes the response.
#[derive(Debug, Clone, Default)]
pub struct DbProbeInfo {
    pub product: Option<String>,
    pub current_db: Option<String>,
    pub catalogs: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfigEntryResponse {
    #[serde(rename = "type")]
    pub extension: String,
    pub id: String,
    pub aliases: Vec<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "currentDB")]
    pub current_db: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub catalogs: Vec<String>,
}

/// `GET {ctx}config/<ext>/<id>` (design §4.8).
pub fn config_entry_response(
    config: &dyn NamedConfig,
    extension: &str,
    id: &str,
    probe: Option<DbProbeInfo>,
) -> Result<ConfigEntryResponse, BridgeError> {
    if !config.has_config(extension, id) {
        return Err(ConfigError::NotFound { category: extension.to_string(), id: id.to_string() }.into());
    }
    let entry = config
        .get_all_ids(extension)
        .into_iter()
        .find(|e| e.id == id)
        .ok_or_else(|| ConfigError::NotFound { category: extension.to_string(), id: id.to_string() })?;
    let probe = probe.unwrap_or_default();
    Ok(ConfigEntryResponse {
        extension: extension.to_string(),
        id: entry.id,
        aliases: entry.aliases,
        description: entry.description,
        product: probe.product,
        current_db: probe.current_db,
        catalogs: probe.catalogs,
    })
}

/// `GET {ctx}config/<ext>/<id>/<detail>` (design §4.8): a single named
/// property out of the entry's bag, since full database-table metadata
/// requires the (out-of-scope) driver layer.
pub fn config_detail_response(
    config: &dyn NamedConfig,
    extension: &str,
    id: &str,
    detail: &str,
) -> Result<serde_json::Value, BridgeError> {
    let props = config.get_config(extension, id, None, None)?;
    let value = props
        .get(detail)
        .ok_or_else(|| ConfigError::NotFound { category: extension.to_string(), id: format!("{id}/{detail}") })?;
    Ok(serde_json::json!({ "property": detail, "value": value }))
}

/// `POST {ctx}encrypt` (design §4.8): server returns the same map with
/// every value replaced by its encrypted form under `<key>.encrypted`.
pub fn encrypt_secrets(
    config: &dyn NamedConfig,
    tenant: &str,
    salt: &str,
    secrets: BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, BridgeError> {
    if tenant.is_empty() {
        return Err(BridgeError::Config(ConfigError::MissingTenant { operation: "encrypt".to_string() }));
    }
    secrets
        .into_iter()
        .map(|(key, value)| {
            config.encrypt(&value, tenant, salt).map(|encrypted| (format!("{key}{ENCRYPTED_SUFFIX}"), encrypted))
        })
        .collect::<Result<_, _>>()
        .map_err(Into::into)
}

/// `POST {ctx}register` (design §4.8): decrypts every value and forwards
/// the cleartext properties to `NamedConfig::register`.
pub fn register_secrets(
    config: &dyn NamedConfig,
    tenant: &str,
    salt: &str,
    encrypted: BTreeMap<String, String>,
) -> Result<(), BridgeError> {
    if tenant.is_empty() {
        return Err(BridgeError::Config(ConfigError::MissingTenant { operation: "register".to_string() }));
    }
    let mut cleartext = BTreeMap::new();
    for (key, value) in encrypted {
        let plain = config.decrypt(&value, tenant, salt)?;
        let key = key.strip_suffix(ENCRYPTED_SUFFIX).unwrap_or(&key).to_string();
        cleartext.insert(key, plain);
    }
    config.register(tenant, cleartext).map_err(Into::into)
}

/// `GET {ctx}error/<qid>` (design §4.4): `200` with the message if
/// present, else the caller renders `404`.
pub fn lookup_error(error_cache: &ErrorCache, qid: &str) -> Option<String> {
    error_cache.get(qid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qbridge_config::InMemoryConfig;

    #[test]
    fn server_config_renders_expected_properties() {
        let summary = ServerConfigSummary {
            server_url: "http://host".into(),
            auth_enabled: true,
            tag: "prod".into(),
            default_format: Format::Csv,
            default_compression: Compression::None,
        };
        let rendered = summary.render();
        assert!(rendered.contains("serverUrl=http://host"));
        assert!(rendered.contains("auth=true"));
        assert!(rendered.contains("format=csv"));
    }

    #[test]
    fn encrypt_then_register_then_get_config_round_trips_cleartext() {
        let config = InMemoryConfig::new();
        let mut secrets = BTreeMap::new();
        secrets.insert("db.password".to_string(), "hunter2".to_string());
        let encrypted = encrypt_secrets(&config, "acme", "salt", secrets).unwrap();
        assert!(encrypted.contains_key(&format!("db.password{ENCRYPTED_SUFFIX}")));
        register_secrets(&config, "acme", "salt", encrypted).unwrap();

        let props = config.get_config("db", "x", None, Some("acme")).unwrap();
        assert_eq!(props.get("db.password").unwrap(), "hunter2");
    }

    #[test]
    fn encrypt_without_tenant_is_bad_request() {
        let config = InMemoryConfig::new();
        let result = encrypt_secrets(&config, "", "salt", BTreeMap::new());
        assert!(matches!(result, Err(BridgeError::Config(ConfigError::MissingTenant { .. }))));
    }

    #[test]
    fn missing_config_entry_reports_config_not_found() {
        let config = InMemoryConfig::new();
        let result = config_entry_response(&config, "db", "missing", None);
        assert!(matches!(result, Err(BridgeError::Config(ConfigError::NotFound { .. }))));
    }
}
