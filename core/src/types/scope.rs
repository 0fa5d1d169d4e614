use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One scope declaration, as stored in a config object payload.
///
/// Only `scopes` matters to the monitor. `version` is the schema version
/// chosen by whoever wrote the payload and is carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScopeDeclaration {
    #[serde(default)]
    pub version: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl ScopeDeclaration {
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The merged set of in-scope repositories, as published on disk.
///
/// Stored as a membership map so the verifier can answer `has_scope` without
/// rebuilding an index. A `BTreeMap` keeps the encoding stable across
/// publishes. On load a missing or null `scopeMap` is empty and a missing
/// `lastUpdated` is the Unix epoch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSnapshot {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub scope_map: BTreeMap<String, bool>,
    #[serde(default)]
    pub last_updated: DateTime<Utc>,
}

impl ScopeSnapshot {
    /// Build a snapshot from a list that may contain duplicates.
    pub fn from_scopes<I, S>(scopes: I, last_updated: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scope_map = scopes.into_iter().map(|s| (s.into(), true)).collect();
        ScopeSnapshot {
            scope_map,
            last_updated,
        }
    }

    /// Exact, case-sensitive membership.
    pub fn has_scope(&self, repository: &str) -> bool {
        self.scope_map.get(repository).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.scope_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scope_map.is_empty()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn declaration_full_payload() {
        let decl = ScopeDeclaration::parse(
            r#"{"version":"1.0.0","scopes":["registry.io/a","registry.io/b"],"lastUpdated":"2025-06-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(decl.version, "1.0.0");
        assert_eq!(decl.scopes, vec!["registry.io/a", "registry.io/b"]);
        assert_eq!(decl.last_updated, Some(ts()));
    }

    #[test]
    fn declaration_scopes_only() {
        let decl = ScopeDeclaration::parse(r#"{"scopes":["r2"]}"#).unwrap();
        assert_eq!(decl.version, "");
        assert_eq!(decl.scopes, vec!["r2"]);
        assert!(decl.last_updated.is_none());
    }

    #[test]
    fn declaration_null_scopes_is_empty() {
        let decl = ScopeDeclaration::parse(r#"{"version":"1","scopes":null}"#).unwrap();
        assert!(decl.scopes.is_empty());
    }

    #[test]
    fn declaration_rejects_malformed() {
        assert!(ScopeDeclaration::parse("not json").is_err());
        assert!(ScopeDeclaration::parse(r#"{"scopes":"r1"}"#).is_err());
        assert!(ScopeDeclaration::parse(r#"{"scopes":[1,2]}"#).is_err());
        assert!(ScopeDeclaration::parse(r#"{"lastUpdated":"yesterday"}"#).is_err());
    }

    #[test]
    fn snapshot_deduplicates() {
        let snap = ScopeSnapshot::from_scopes(vec!["a", "b", "b", "c", "a"], ts());
        assert_eq!(snap.len(), 3);
        let keys: Vec<_> = snap.scope_map.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn snapshot_membership_is_exact() {
        let snap = ScopeSnapshot::from_scopes(vec!["registry.io/app"], ts());
        assert!(snap.has_scope("registry.io/app"));
        assert!(!snap.has_scope("registry.io/app2"));
        assert!(!snap.has_scope("registry.io/App"));
        assert!(!snap.has_scope("registry.io"));
    }

    #[test]
    fn snapshot_false_entry_is_not_member() {
        let snap: ScopeSnapshot = serde_json::from_value(json!({
            "scopeMap": {"r1": true, "r2": false},
            "lastUpdated": "2025-06-01T12:00:00Z"
        }))
        .unwrap();
        assert!(snap.has_scope("r1"));
        assert!(!snap.has_scope("r2"));
    }

    #[test]
    fn snapshot_tolerates_null_map_and_missing_timestamp() {
        let snap: ScopeSnapshot = serde_json::from_str(r#"{"scopeMap":null}"#).unwrap();
        assert!(snap.is_empty());
        assert_eq!(snap.last_updated, DateTime::<Utc>::default());
        assert!(!snap.has_scope("r1"));

        let snap: ScopeSnapshot = serde_json::from_str(r#"{"scopeMap":{"r1":true}}"#).unwrap();
        assert!(snap.has_scope("r1"));
    }

    #[test]
    fn snapshot_wire_format() {
        let snap = ScopeSnapshot::from_scopes(vec!["r1", "r2"], ts());
        let value = serde_json::to_value(&snap).unwrap();
        assert_eq!(
            value,
            json!({
                "scopeMap": {"r1": true, "r2": true},
                "lastUpdated": "2025-06-01T12:00:00Z"
            })
        );
    }
}
