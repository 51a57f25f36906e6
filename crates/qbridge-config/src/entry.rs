use std::collections::BTreeMap;

/// Summary returned by `GET {ctx}config/<ext>` — one row per registered id
/// under a category.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ConfigEntry {
    pub id: String,
    pub description: String,
    #[serde(skip)]
    pub aliases: Vec<String>,
    #[serde(skip)]
    pub properties: BTreeMap<String, String>,
}

impl ConfigEntry {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self { id: id.into(), description: description.into(), aliases: Vec::new(), properties: BTreeMap::new() }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}
