use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use qbridge_auth::Claims;
use qbridge_error::ConfigError;

use crate::entry::ConfigEntry;
use crate::secrets::{decrypt_value, encrypt_value};
use crate::NamedConfig;

/// Reference [`NamedConfig`] backed by in-process maps. A real deployment
/// persists this state in a file tree or database (design §1, out of
/// scope); this implementation exists so the bridge is runnable and
/// testable standalone.
#[derive(Default)]
pub struct InMemoryConfig {
    categories: RwLock<HashMap<String, HashMap<String, ConfigEntry>>>,
    tenants: RwLock<HashMap<String, BTreeMap<String, String>>>,
    tokens: RwLock<HashMap<String, Claims>>,
}

impl InMemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named connection-descriptor-style entry under `category`.
    pub fn put_entry(&self, category: impl Into<String>, entry: ConfigEntry) {
        self.categories.write().entry(category.into()).or_default().insert(entry.id.clone(), entry);
    }

    /// Registers `token` as mapping to `claims`, for [`crate::NamedConfig`]'s
    /// token-verification collaborator role (qbridge-auth's `TokenVerifier`).
    pub fn put_token(&self, token: impl Into<String>, claims: Claims) {
        self.tokens.write().insert(token.into(), claims);
    }

    pub(crate) fn lookup_claims(&self, token: &str) -> Option<Claims> {
        self.tokens.read().get(token).cloned()
    }
}

impl NamedConfig for InMemoryConfig {
    fn get_all_ids(&self, category: &str) -> Vec<ConfigEntry> {
        self.categories.read().get(category).map(|ids| ids.values().cloned().collect()).unwrap_or_default()
    }

    fn has_config(&self, category: &str, id: &str) -> bool {
        self.categories.read().get(category).map(|ids| ids.contains_key(id)).unwrap_or(false)
    }

    fn get_config(
        &self,
        category: &str,
        id: &str,
        _tag: Option<&str>,
        tenant: Option<&str>,
    ) -> Result<BTreeMap<String, String>, ConfigError> {
        let from_category =
            self.categories.read().get(category).and_then(|ids| ids.get(id)).map(|entry| entry.properties.clone());
        let from_tenant = tenant.and_then(|tenant| self.tenants.read().get(tenant).cloned());

        match (from_category, from_tenant) {
            (Some(mut props), Some(tenant_props)) => {
                props.extend(tenant_props);
                Ok(props)
            }
            (Some(props), None) | (None, Some(props)) => Ok(props),
            (None, None) => Err(ConfigError::NotFound { category: category.to_string(), id: id.to_string() }),
        }
    }

    fn encrypt(&self, value: &str, tenant: &str, salt: &str) -> Result<String, ConfigError> {
        encrypt_value(value, tenant, salt).map_err(|e| ConfigError::Encryption(e.to_string()))
    }

    fn decrypt(&self, value: &str, tenant: &str, salt: &str) -> Result<String, ConfigError> {
        decrypt_value(value, tenant, salt).map_err(|e| ConfigError::Decryption(e.to_string()))
    }

    fn register(&self, tenant: &str, properties: BTreeMap<String, String>) -> Result<(), ConfigError> {
        self.tenants.write().entry(tenant.to_string()).or_default().extend(properties);
        Ok(())
    }
}
