//! Compatibility layer for the deprecated `data/defaults.json` flat file.
//!
//! When the file exists its object is folded in as the lowest-priority default
//! fragment: it is merged before every numbered fragment, so its values only
//! survive for keys no fragment defines. The resulting fragment carries
//! [`LEGACY_MARKER_KEY`] so callers can tell the user to migrate.

use std::fs;
use std::path::Path;

use serde_json::Value;

use super::error::{ConfigError, ConfigResult};
use super::fragment::{Fragment, Values};

/// Name given to the injected fragment.
pub const LEGACY_FRAGMENT_NAME: &str = "legacy_config_compat";

/// Key set to `true` in the store when the legacy file was loaded.
pub const LEGACY_MARKER_KEY: &str = "legacy_config_compat";

/// Load the legacy file as a fragment. Returns `Ok(None)` if it does not exist.
pub fn load_legacy(path: &Path) -> ConfigResult<Option<Fragment>> {
    if !path.is_file() {
        tracing::debug!(path = %path.display(), "no legacy config, compat layer inactive");
        return Ok(None);
    }

    let text = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    let mut values: Values =
        serde_json::from_str(&text).map_err(|source| ConfigError::LegacyConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
    values.insert(LEGACY_MARKER_KEY.to_string(), Value::Bool(true));

    tracing::warn!(
        path = %path.display(),
        keys = values.len() - 1,
        "legacy config compat layer active"
    );

    Ok(Some(Fragment::new(LEGACY_FRAGMENT_NAME, values)))
}

/// Whether a resolved mapping was produced with the legacy layer active.
pub fn is_active(values: &Values) -> bool {
    values.get(LEGACY_MARKER_KEY) == Some(&Value::Bool(true))
}

/// Print the migration banner shown when the legacy layer is active.
pub fn print_deprecation_warning(path: &Path) {
    let rule = "=".repeat(80);
    println!("{}", rule);
    println!(
        "Warning! Legacy config compat layer active, because {} exists!",
        path.display()
    );
    println!("Please move these options into a TOML fragment under data/architectures/.");
    println!("{}", rule);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_absent_file_is_skipped() {
        let dir = tempdir().unwrap();
        let loaded = load_legacy(&dir.path().join("defaults.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_loads_values_and_marker() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("defaults.json");
        fs::write(&path, r#"{"debian_mirror": "http://mirror", "vyos_branch": null}"#).unwrap();

        let fragment = load_legacy(&path).unwrap().unwrap();
        assert_eq!(fragment.name(), LEGACY_FRAGMENT_NAME);
        assert_eq!(fragment.values()["debian_mirror"], json!("http://mirror"));
        assert_eq!(fragment.values()["vyos_branch"], Value::Null);
        assert!(is_active(fragment.values()));
    }

    #[test]
    fn test_malformed_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("defaults.json");
        fs::write(&path, "[1, 2").unwrap();

        let err = load_legacy(&path).unwrap_err();
        assert!(matches!(err, ConfigError::LegacyConfigParse { .. }));
    }

    #[test]
    fn test_non_object_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("defaults.json");
        fs::write(&path, "[\"debian_mirror\"]").unwrap();

        assert!(matches!(
            load_legacy(&path),
            Err(ConfigError::LegacyConfigParse { .. })
        ));
    }
}
