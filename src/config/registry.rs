//! Discovery of configuration units under the architectures root.
//!
//! The root is scanned exactly one level deep:
//!
//! ```text
//! data/architectures/
//!   10_build_defaults.toml   -> default fragment "10_build_defaults"
//!   amd64/                   -> architecture module "amd64"
//!     generic_iso.toml       -> target overlay (loaded by ArchitectureModule)
//! ```
//!
//! Files are default fragments, directories are architecture modules. The
//! registry is built once per process and read-only afterwards.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use super::error::{ConfigError, ConfigResult};
use super::fragment::{is_private, unit_name, Fragment};
use super::legacy;
use super::overlay::ArchitectureModule;

/// All discovered default fragments and architecture modules.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    defaults: BTreeMap<String, Fragment>,
    legacy: Option<Fragment>,
    architectures: HashMap<String, ArchitectureModule>,
}

impl ModuleRegistry {
    /// Create an empty registry for explicit registration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `root` and load every unit found. Any unit that fails to load
    /// aborts discovery.
    pub fn discover(root: &Path) -> ConfigResult<Self> {
        let mut registry = Self::new();

        let entries = fs::read_dir(root).map_err(|e| ConfigError::io(root, e))?;
        for entry in entries {
            let path = entry.map_err(|e| ConfigError::io(root, e))?.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if path.is_dir() {
                if is_private(file_name) {
                    continue;
                }
                registry.register_architecture(ArchitectureModule::load(file_name, &path)?)?;
            } else if unit_name(&path).is_some() {
                registry.register_default(Fragment::from_file(&path)?)?;
            }
        }

        tracing::debug!(
            root = %root.display(),
            defaults = ?registry.defaults.keys().collect::<Vec<_>>(),
            architectures = registry.architectures.len(),
            "discovered configuration units"
        );

        Ok(registry)
    }

    /// Activate the legacy compat layer if `path` exists.
    pub fn with_legacy_config(mut self, path: &Path) -> ConfigResult<Self> {
        self.legacy = legacy::load_legacy(path)?;
        Ok(self)
    }

    /// Register a default fragment. Names must be unique.
    pub fn register_default(&mut self, fragment: Fragment) -> ConfigResult<()> {
        if self.defaults.contains_key(fragment.name()) {
            return Err(ConfigError::DuplicateFragment(fragment.name().to_string()));
        }
        self.defaults.insert(fragment.name().to_string(), fragment);
        Ok(())
    }

    /// Register an architecture module. Names must be unique.
    pub fn register_architecture(&mut self, module: ArchitectureModule) -> ConfigResult<()> {
        if self.architectures.contains_key(module.name()) {
            return Err(ConfigError::DuplicateArchitecture(module.name().to_string()));
        }
        self.architectures.insert(module.name().to_string(), module);
        Ok(())
    }

    /// Default fragments in lexical name order.
    pub fn default_fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.defaults.values()
    }

    /// The legacy fragment, if the compat layer is active.
    pub fn legacy_fragment(&self) -> Option<&Fragment> {
        self.legacy.as_ref()
    }

    /// Fragments in baseline merge order: legacy first, then the defaults
    /// lexically.
    pub fn baseline_fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.legacy.iter().chain(self.defaults.values())
    }

    pub fn architecture(&self, name: &str) -> Option<&ArchitectureModule> {
        self.architectures.get(name)
    }

    /// Every architecture with its ordered set of target names.
    pub fn target_tree(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.architectures
            .values()
            .map(|module| (module.name().to_string(), module.target_names()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Values;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_discover_classifies_units() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("20_site.toml"), "a = 2\n").unwrap();
        fs::write(root.join("10_build_defaults.toml"), "a = 1\n").unwrap();
        fs::write(root.join("notes.txt"), "ignored").unwrap();
        fs::create_dir(root.join("amd64")).unwrap();
        fs::write(root.join("amd64/generic_iso.toml"), "b = 1\n").unwrap();
        fs::create_dir(root.join("arm64")).unwrap();
        fs::create_dir(root.join("__pycache__")).unwrap();

        let registry = ModuleRegistry::discover(root).unwrap();

        let names: Vec<_> = registry.default_fragments().map(|f| f.name()).collect();
        assert_eq!(names, vec!["10_build_defaults", "20_site"]);

        let tree = registry.target_tree();
        assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["amd64", "arm64"]);
        assert!(tree["amd64"].contains("generic_iso"));
        assert!(tree["arm64"].is_empty());
        assert!(registry.legacy_fragment().is_none());
    }

    #[test]
    fn test_discover_fails_on_broken_unit() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("10_broken.toml"), "= nope").unwrap();

        let err = ModuleRegistry::discover(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::FragmentLoad { .. }));
    }

    #[test]
    fn test_discover_missing_root() {
        let dir = tempdir().unwrap();
        let err = ModuleRegistry::discover(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_duplicate_architecture_rejected() {
        let mut registry = ModuleRegistry::new();
        registry
            .register_architecture(ArchitectureModule::new("amd64"))
            .unwrap();

        let err = registry
            .register_architecture(ArchitectureModule::new("amd64"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateArchitecture(name) if name == "amd64"));
    }

    #[test]
    fn test_duplicate_fragment_rejected() {
        let mut registry = ModuleRegistry::new();
        registry
            .register_default(Fragment::new("10_a", Values::new()))
            .unwrap();
        assert!(registry
            .register_default(Fragment::new("10_a", Values::new()))
            .is_err());
    }

    #[test]
    fn test_legacy_fragment_merges_first() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("10_build_defaults.toml"), "a = 1\n").unwrap();
        let legacy = dir.path().join("defaults.json");
        fs::write(&legacy, r#"{"a": 0}"#).unwrap();

        let registry = ModuleRegistry::discover(dir.path())
            .unwrap()
            .with_legacy_config(&legacy)
            .unwrap();

        let order: Vec<_> = registry.baseline_fragments().map(|f| f.name()).collect();
        assert_eq!(order, vec![legacy::LEGACY_FRAGMENT_NAME, "10_build_defaults"]);
        assert_eq!(
            registry.legacy_fragment().unwrap().values()["a"],
            json!(0)
        );
    }
}
