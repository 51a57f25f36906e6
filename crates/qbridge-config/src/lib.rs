//! The named-configuration store (design §3, `NamedConfig`).
//!
//! The core treats configuration as a read-only collaborator identified by
//! `(category, id)` pairs — connection descriptors, database aliases,
//! bearer-token claims, and tenant secrets all live behind the same
//! [`NamedConfig`] interface. This crate ships an in-memory reference
//! implementation; a real deployment would back it with a file tree or a
//! database, which is explicitly out of scope here.

mod entry;
mod memory;
mod secrets;
mod token;

pub use entry::ConfigEntry;
pub use memory::InMemoryConfig;
pub use secrets::{decrypt_value, encrypt_value, SecretError};

use qbridge_error::ConfigError;
use std::collections::BTreeMap;

/// Read-only view over named configuration plus the mutating operations the
/// admin endpoints need (`encrypt`, `register`). Implementations are
/// expected to be cheap to clone/share (`Arc<dyn NamedConfig>`).
pub trait NamedConfig: Send + Sync {
    /// All ids registered under `category`, for `GET {ctx}config/<ext>`.
    fn get_all_ids(&self, category: &str) -> Vec<ConfigEntry>;

    /// `true` iff `(category, id)` has a registered entry.
    fn has_config(&self, category: &str, id: &str) -> bool;

    /// The property bag for `(category, id)`, optionally scoped by `tag`
    /// and `tenant`. When `tenant` is given, its `register`ed properties are
    /// merged on top of (or, absent a `(category, id)` entry, returned in
    /// place of) the category entry's own bag. Returns `ConfigError::NotFound`
    /// only when neither source has anything.
    fn get_config(
        &self,
        category: &str,
        id: &str,
        tag: Option<&str>,
        tenant: Option<&str>,
    ) -> Result<BTreeMap<String, String>, ConfigError>;

    /// Encrypts `value` under `tenant`'s key, salted, for the `encrypt`
    /// admin endpoint.
    fn encrypt(&self, value: &str, tenant: &str, salt: &str) -> Result<String, ConfigError>;

    /// Reverses [`NamedConfig::encrypt`] for `register`.
    fn decrypt(&self, value: &str, tenant: &str, salt: &str) -> Result<String, ConfigError>;

    /// Stores already-decrypted `properties` under `tenant`, for the
    /// `register` admin endpoint.
    fn register(&self, tenant: &str, properties: BTreeMap<String, String>) -> Result<(), ConfigError>;
}
