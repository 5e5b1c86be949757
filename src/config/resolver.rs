//! Resolution of an (architecture, target) pair onto a [`ConfigStore`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::error::{ConfigError, ConfigResult};
use super::overlay::TargetOverlay;
use super::registry::ModuleRegistry;
use super::store::ConfigStore;

/// Looks up target overlays in a registry and applies them to a store.
pub struct TargetResolver<'a> {
    registry: &'a ModuleRegistry,
}

impl<'a> TargetResolver<'a> {
    pub fn new(registry: &'a ModuleRegistry) -> Self {
        Self { registry }
    }

    /// Apply `architecture`/`target` to `store` and return the overlay so the
    /// caller can run its configure-hook.
    ///
    /// The overlay's values are merged with override enabled: its scalars win
    /// over the defaults and its lists are placed in front of theirs.
    pub fn load(
        &self,
        store: &mut ConfigStore,
        architecture: &str,
        target: &str,
    ) -> ConfigResult<Arc<TargetOverlay>> {
        let module = self
            .registry
            .architecture(architecture)
            .ok_or_else(|| ConfigError::unknown_architecture(architecture, &self.list_targets()))?;

        let overlay = module
            .target(target)
            .ok_or_else(|| ConfigError::TargetNotFound {
                architecture: architecture.to_string(),
                target: target.to_string(),
                available: module.target_names().into_iter().collect(),
            })?;

        tracing::debug!(architecture, target, "applying target overlay");
        store.merge(&overlay.values(), true);

        Ok(Arc::clone(overlay))
    }

    /// Every architecture with its ordered set of target names.
    pub fn list_targets(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.registry.target_tree()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ArchitectureModule, Fragment, Values};
    use serde_json::{json, Value};

    fn values(v: Value) -> Values {
        match v {
            Value::Object(map) => map,
            _ => panic!("test values must be an object"),
        }
    }

    fn registry() -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        registry
            .register_default(Fragment::new(
                "10_build_defaults",
                values(json!({
                    "kernel_version": "5.10.77",
                    "build_type": "development",
                    "bootloaders": "grub-efi",
                    "additional_repositories": ["deb http://defaults bullseye main"],
                })),
            ))
            .unwrap();

        let generic = TargetOverlay::new(
            "generic_iso",
            values(json!({
                "kernel_flavor": "amd64-vyos",
                "bootloaders": "syslinux,grub-efi",
                "additional_repositories": ["deb [arch=amd64] https://repo.saltproject.io buster main"],
            })),
        );
        registry
            .register_architecture(ArchitectureModule::new("amd64").with_target(generic))
            .unwrap();
        registry
            .register_architecture(ArchitectureModule::new("arm64"))
            .unwrap();
        registry
    }

    #[test]
    fn test_generic_iso_end_to_end() {
        let registry = registry();
        let mut store = ConfigStore::from_defaults(&registry);

        let overlay = TargetResolver::new(&registry)
            .load(&mut store, "amd64", "generic_iso")
            .unwrap();

        assert_eq!(overlay.name(), "generic_iso");
        assert_eq!(store.get_str("kernel_version").unwrap(), "5.10.77");
        assert_eq!(store.get_str("build_type").unwrap(), "development");
        assert_eq!(store.get_str("kernel_flavor").unwrap(), "amd64-vyos");
        assert_eq!(store.get_str("bootloaders").unwrap(), "syslinux,grub-efi");
        assert_eq!(
            store.get("additional_repositories").unwrap(),
            &json!([
                "deb [arch=amd64] https://repo.saltproject.io buster main",
                "deb http://defaults bullseye main"
            ])
        );
    }

    #[test]
    fn test_unknown_architecture() {
        let registry = registry();
        let mut store = ConfigStore::from_defaults(&registry);

        let err = TargetResolver::new(&registry)
            .load(&mut store, "nonexistent_arch", "x")
            .unwrap_err();
        match err {
            ConfigError::ArchitectureNotFound {
                architecture,
                available,
            } => {
                assert_eq!(architecture, "nonexistent_arch");
                assert_eq!(available, vec!["amd64".to_string(), "arm64".to_string()]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_unknown_target() {
        let registry = registry();
        let mut store = ConfigStore::from_defaults(&registry);
        let before = store.to_mapping();

        let err = TargetResolver::new(&registry)
            .load(&mut store, "amd64", "nonexistent_target")
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TargetNotFound { ref available, .. } if available == &vec!["generic_iso".to_string()]
        ));
        assert_eq!(store.to_mapping(), before);
    }

    #[test]
    fn test_list_targets() {
        let registry = registry();
        let tree = TargetResolver::new(&registry).list_targets();

        assert_eq!(tree.len(), 2);
        assert_eq!(
            tree["amd64"].iter().collect::<Vec<_>>(),
            vec!["generic_iso"]
        );
        assert!(tree["arm64"].is_empty());
    }
}
