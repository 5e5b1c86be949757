//! Configuration fragments and the TOML unit format they are read from.
//!
//! A unit is a single `*.toml` file. Its top-level keys become the fragment's
//! values, except keys starting with `_`, which are private to the unit
//! (overlay metadata such as `_base` and `_configure`) and never reach the
//! config store.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::error::{ConfigError, ConfigResult};

/// Key/value declarations contributed by one fragment.
pub type Values = serde_json::Map<String, Value>;

/// File extension of configuration units.
pub const UNIT_EXTENSION: &str = "toml";

/// A platform-independent default fragment.
///
/// Fragments are merged in lexical order of [`Fragment::name`], so the
/// numeric prefix convention (`10_build_defaults`, `20_site`) decides which
/// fragment wins a scalar conflict.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    name: String,
    values: Values,
    source: Option<PathBuf>,
}

impl Fragment {
    /// Create an in-memory fragment.
    pub fn new(name: impl Into<String>, values: Values) -> Self {
        Self {
            name: name.into(),
            values,
            source: None,
        }
    }

    /// Load a default fragment from a TOML unit. The fragment is named after
    /// the file stem.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let name = unit_name(path)
            .ok_or_else(|| ConfigError::load(path, "not a configuration unit"))?;
        let (values, _private) = split_private(path, read_unit(path)?)?;

        Ok(Self {
            name,
            values,
            source: Some(path.to_path_buf()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    /// File the fragment was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

/// Whether a unit or key name is private (`_name` or `.name`).
pub fn is_private(name: &str) -> bool {
    name.starts_with('_') || name.starts_with('.')
}

/// Name of the configuration unit at `path`, or `None` when the path is not a
/// public `*.toml` file name.
pub fn unit_name(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some(UNIT_EXTENSION) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() || is_private(stem) {
        return None;
    }
    Some(stem.to_string())
}

/// Read and parse a TOML unit.
pub(crate) fn read_unit(path: &Path) -> ConfigResult<toml::Table> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::load(path, e))?;
    toml::from_str(&text).map_err(|e| ConfigError::load(path, e))
}

/// Split a parsed unit into its public values and its private table.
pub(crate) fn split_private(
    path: &Path,
    table: toml::Table,
) -> ConfigResult<(Values, toml::Table)> {
    let mut values = Values::new();
    let mut private = toml::Table::new();

    for (key, value) in table {
        if is_private(&key) {
            private.insert(key, value);
            continue;
        }
        let value = serde_json::to_value(value).map_err(|e| ConfigError::load(path, e))?;
        values.insert(key, value);
    }

    Ok((values, private))
}
