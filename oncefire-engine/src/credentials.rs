use std::collections::{BTreeMap, HashSet};

use log::{info, warn};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_KEYS_ENV: &str = "DEVICE_KEYS";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("credential value must be a list of strings or a map of strings, found {0}")]
    Shape(String),
}

/// Process-wide device keys, loaded once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSet {
    /// Keys unioned into every eligible task's key list.
    List(Vec<String>),
    /// Alias to key. A task naming no keys receives every value.
    Map(BTreeMap<String, String>),
}

impl Default for CredentialSet {
    fn default() -> Self {
        CredentialSet::List(Vec::new())
    }
}

impl CredentialSet {
    pub fn from_json_str(raw: &str) -> Result<Self, CredentialError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, CredentialError> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(key) => Ok(key),
                    other => Err(CredentialError::Shape(format!("list entry {other}"))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(CredentialSet::List),
            Value::Object(entries) => entries
                .into_iter()
                .map(|(alias, key)| match key {
                    Value::String(key) => Ok((alias, key)),
                    other => Err(CredentialError::Shape(format!("value {other} for '{alias}'"))),
                })
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(CredentialSet::Map),
            other => Err(CredentialError::Shape(other.to_string())),
        }
    }

    /// Reads the set from environment variable `name`. An unset variable is an
    /// empty list; a malformed one is logged and also treated as empty.
    pub fn from_env(name: &str) -> Self {
        let Ok(raw) = std::env::var(name) else {
            info!("{} is not set, no device keys will be injected", name);
            return CredentialSet::default();
        };
        match Self::from_json_str(&raw) {
            Ok(set) => {
                info!("Loaded device keys from {} ({} form, {} entries)", name, set.kind(), set.len());
                set
            }
            Err(err) => {
                warn!("Ignoring {}: {}", name, err);
                CredentialSet::default()
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CredentialSet::List(_) => "list",
            CredentialSet::Map(_) => "map",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CredentialSet::List(keys) => keys.len(),
            CredentialSet::Map(aliases) => aliases.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Produces the outgoing key list for a task that declared `declared`.
    /// Never logs key material, only aliases.
    pub fn resolve(&self, declared: &[String]) -> Vec<String> {
        match self {
            CredentialSet::List(keys) if keys.is_empty() => declared.to_vec(),
            CredentialSet::List(keys) => {
                info!("Injecting {} device key(s)", keys.len());
                let mut seen = HashSet::new();
                declared
                    .iter()
                    .chain(keys)
                    .filter(|key| seen.insert(key.as_str()))
                    .cloned()
                    .collect()
            }
            CredentialSet::Map(aliases) if declared.is_empty() && !aliases.is_empty() => {
                info!("Task declares no device keys, injecting all {}", aliases.len());
                aliases.values().cloned().collect()
            }
            CredentialSet::Map(aliases) => declared
                .iter()
                .map(|alias| match aliases.get(alias) {
                    Some(key) => {
                        info!("Substituting alias '{}' with its masked key", alias);
                        key.clone()
                    }
                    None => alias.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn keys(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn map(pairs: &[(&str, &str)]) -> CredentialSet {
        CredentialSet::Map(
            pairs
                .iter()
                .map(|(alias, key)| (alias.to_string(), key.to_string()))
                .collect(),
        )
    }

    #[test]
    fn parses_both_shapes() {
        assert_eq!(
            CredentialSet::from_json_str(r#"["k1", "k2"]"#).unwrap(),
            CredentialSet::List(keys(&["k1", "k2"]))
        );
        assert_eq!(
            CredentialSet::from_json_str(r#"{"iphone": "k1"}"#).unwrap(),
            map(&[("iphone", "k1")])
        );
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(matches!(CredentialSet::from_json_str("[oops"), Err(CredentialError::Json(_))));
        assert!(matches!(CredentialSet::from_value(json!(5)), Err(CredentialError::Shape(_))));
        assert!(matches!(CredentialSet::from_value(json!(["a", 1])), Err(CredentialError::Shape(_))));
        assert!(matches!(CredentialSet::from_value(json!({"a": null})), Err(CredentialError::Shape(_))));
    }

    #[test]
    fn unset_variable_means_no_keys() {
        let set = CredentialSet::from_env("ONCEFIRE_CREDENTIALS_NEVER_SET_4F1C");
        assert_eq!(set, CredentialSet::default());
        assert!(set.is_empty());
    }

    #[test]
    fn list_union_keeps_declared_and_drops_duplicates() {
        let set = CredentialSet::List(keys(&["k2", "k3"]));
        let resolved = set.resolve(&keys(&["k1", "k2", "k1"]));
        assert_eq!(resolved, keys(&["k1", "k2", "k3"]));
    }

    #[test]
    fn empty_list_passes_declared_through() {
        let declared = keys(&["k1", "k1"]);
        assert_eq!(CredentialSet::default().resolve(&declared), declared);
    }

    #[test]
    fn map_substitutes_known_aliases_only() {
        let set = map(&[("iphone", "secret-1"), ("ipad", "secret-2")]);
        let resolved = set.resolve(&keys(&["ipad", "raw-key", "iphone", "ipad"]));
        assert_eq!(resolved, keys(&["secret-2", "raw-key", "secret-1", "secret-2"]));
    }

    #[test]
    fn map_with_no_declared_keys_injects_everything() {
        let set = map(&[("iphone", "secret-1"), ("ipad", "secret-2")]);
        let mut resolved = set.resolve(&[]);
        resolved.sort();
        assert_eq!(resolved, keys(&["secret-1", "secret-2"]));
        assert!(map(&[]).resolve(&[]).is_empty());
    }

    #[test]
    fn resolution_is_idempotent() {
        let declared = keys(&["iphone", "k9"]);
        for set in [
            CredentialSet::List(keys(&["k9", "k10"])),
            map(&[("iphone", "secret-1")]),
            map(&[("iphone", "secret-1"), ("ipad", "secret-2")]),
        ] {
            assert_eq!(set.resolve(&declared), set.resolve(&declared));
            assert_eq!(set.resolve(&[]), set.resolve(&[]));
        }
    }
}
