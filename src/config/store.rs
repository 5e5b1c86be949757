//! The merged build configuration.
//!
//! A [`ConfigStore`] is built explicitly from a [`ModuleRegistry`] and then
//! threaded through the build. Reads never trigger a rebuild: a key missing
//! from an uninitialised store is an error, not a silent default.
//!
//! # Merge rules
//!
//! For every incoming `key = value`:
//!
//! - `null` values are ignored.
//! - A key not yet in the store is inserted.
//! - If both sides are arrays, the incoming array is placed in front of the
//!   existing one.
//! - Otherwise the incoming value replaces the existing one only when
//!   `override_existing` is set.

use serde_json::Value;

use super::error::{ConfigError, ConfigResult};
use super::fragment::Values;
use super::registry::ModuleRegistry;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigStore {
    values: Values,
}

impl ConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the baseline configuration of `registry`.
    pub fn from_defaults(registry: &ModuleRegistry) -> Self {
        let mut store = Self::new();
        store.rebuild_default_config(registry);
        store
    }

    /// Reset the store and merge the baseline fragments in lexical order.
    ///
    /// Fragments are merged with override enabled so that `20_x` wins a
    /// scalar conflict against `10_x`.
    pub fn rebuild_default_config(&mut self, registry: &ModuleRegistry) {
        self.values.clear();
        for fragment in registry.baseline_fragments() {
            tracing::debug!(
                fragment = fragment.name(),
                source = ?fragment.source(),
                "merging default fragment"
            );
            self.merge(fragment.values(), true);
        }
    }

    /// Merge `incoming` into the store.
    pub fn merge(&mut self, incoming: &Values, override_existing: bool) {
        for (key, value) in incoming {
            if value.is_null() {
                continue;
            }

            match self.values.get_mut(key) {
                None => {
                    self.values.insert(key.clone(), value.clone());
                }
                Some(Value::Array(existing)) if value.is_array() => {
                    let mut merged = value.as_array().cloned().unwrap_or_default();
                    merged.append(existing);
                    *existing = merged;
                }
                Some(existing) => {
                    if override_existing {
                        *existing = value.clone();
                    } else {
                        tracing::debug!(key = %key, "keeping existing value");
                    }
                }
            }
        }
    }

    pub fn get(&self, key: &str) -> ConfigResult<&Value> {
        self.values.get(key).ok_or_else(|| ConfigError::KeyNotFound {
            key: key.to_string(),
            dump: self.dump(),
        })
    }

    /// Overwrite `key` directly, bypassing the merge rules.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Independent copy of the current mapping.
    pub fn to_mapping(&self) -> Values {
        self.values.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get_str(&self, key: &str) -> ConfigResult<&str> {
        self.get(key)?.as_str().ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            expected: "a string",
        })
    }

    pub fn get_bool(&self, key: &str) -> ConfigResult<bool> {
        self.get(key)?.as_bool().ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            expected: "a boolean",
        })
    }

    /// Read a list of strings.
    pub fn get_str_list(&self, key: &str) -> ConfigResult<Vec<String>> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            expected: "a list of strings",
        };
        self.get(key)?
            .as_array()
            .ok_or_else(invalid)?
            .iter()
            .map(|v| v.as_str().map(str::to_string).ok_or_else(invalid))
            .collect()
    }

    fn dump(&self) -> String {
        serde_json::to_string_pretty(&self.values).unwrap_or_else(|_| format!("{:?}", self.values))
    }
}
