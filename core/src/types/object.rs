use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::scope::ScopeDeclaration;

/// A named record owned by the configuration store. The monitor only reads
/// these; `version` changes whenever the store changes the object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigObject {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl ConfigObject {
    pub fn new(name: &str, version: &str) -> Self {
        ConfigObject {
            name: name.to_string(),
            version: version.to_string(),
            data: BTreeMap::new(),
        }
    }

    /// Builder-style helper for adding a payload.
    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.data.insert(key.to_string(), value.to_string());
        self
    }

    /// Parse every payload as a `ScopeDeclaration`, in key order.
    ///
    /// Each item carries the payload key so callers can report which entry
    /// failed to parse.
    pub fn declarations(
        &self,
    ) -> impl Iterator<Item = (&str, Result<ScopeDeclaration, serde_json::Error>)> + '_ {
        self.data
            .iter()
            .map(|(key, value)| (key.as_str(), ScopeDeclaration::parse(value)))
    }
}
