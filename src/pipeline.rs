//! Configuration pipeline for one build request.
//!
//! ```text
//! ModuleRegistry::discover ─► ConfigStore::from_defaults ─► TargetResolver::load
//!        (once)                     (baseline)                 (overlay)
//!                                                                 │
//!         build-config.json ◄── request options, build_dir ◄──────┘
//! ```

use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;

use crate::config::{legacy, ConfigStore, ModuleRegistry, TargetOverlay, TargetResolver, Values};
use crate::defaults::{default_build_by, BuildPaths};

/// What the user asked to build.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    pub architecture: String,
    pub target: String,
    /// Options given on the command line. Merged after the overlay with
    /// override enabled, so they win over fragments; lists are prepended.
    pub options: Values,
}

impl BuildRequest {
    pub fn new(architecture: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            architecture: architecture.into(),
            target: target.into(),
            options: Values::new(),
        }
    }

    /// Add an option; `None` leaves it to the fragments.
    pub fn option(mut self, key: &str, value: Option<impl Into<Value>>) -> Self {
        if let Some(value) = value {
            self.options.insert(key.to_string(), value.into());
        }
        self
    }
}

/// Result of resolving a build request.
pub struct ResolvedBuild {
    pub store: ConfigStore,
    pub overlay: Arc<TargetOverlay>,
}

impl ResolvedBuild {
    /// Whether the legacy `defaults.json` contributed to this build.
    pub fn legacy_active(&self) -> bool {
        legacy::is_active(&self.store.to_mapping())
    }
}

/// Discover the configuration units of a checkout.
pub fn discover(paths: &BuildPaths) -> Result<ModuleRegistry> {
    let registry = ModuleRegistry::discover(&paths.architectures)?
        .with_legacy_config(&paths.legacy_defaults)?;
    Ok(registry)
}

/// Resolve `request` into a finalized store.
pub fn resolve(
    registry: &ModuleRegistry,
    paths: &BuildPaths,
    request: &BuildRequest,
) -> Result<ResolvedBuild> {
    let mut store = ConfigStore::from_defaults(registry);

    let overlay = TargetResolver::new(registry)
        .load(&mut store, &request.architecture, &request.target)
        .with_context(|| {
            format!(
                "cannot configure {}/{}",
                request.architecture, request.target
            )
        })?;

    store.merge(&request.options, true);

    let mut fallback = Values::new();
    fallback.insert("build_by".into(), Value::String(default_build_by()));
    store.merge(&fallback, false);

    store.set("build_architecture", request.architecture.as_str());
    store.set("build_target", request.target.as_str());
    store.set(
        "build_dir",
        paths.build_dir.to_string_lossy().into_owned(),
    );

    Ok(ResolvedBuild { store, overlay })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn checkout(root: &Path) -> BuildPaths {
        let paths = BuildPaths::new(root);
        let arch = &paths.architectures;
        fs::create_dir_all(arch.join("amd64")).unwrap();
        fs::write(
            arch.join("10_build_defaults.toml"),
            r#"
kernel_version = "5.10.77"
build_type = "development"
build_by = "ci@vyos"
custom_packages = ["vim"]
debug = false
"#,
        )
        .unwrap();
        fs::write(
            arch.join("amd64/generic_iso.toml"),
            r#"
kernel_flavor = "amd64-vyos"
bootloaders = "syslinux,grub-efi"
"#,
        )
        .unwrap();
        paths
    }

    #[test]
    fn test_resolve_applies_layers_in_order() {
        let dir = tempdir().unwrap();
        let paths = checkout(dir.path());
        let registry = discover(&paths).unwrap();

        let request = BuildRequest::new("amd64", "generic_iso")
            .option("build_type", Some("release"))
            .option("custom_packages", Some(vec!["tmux"]))
            .option("debug", None::<bool>);
        let resolved = resolve(&registry, &paths, &request).unwrap();
        let store = &resolved.store;

        assert_eq!(resolved.overlay.name(), "generic_iso");
        assert_eq!(store.get_str("kernel_flavor").unwrap(), "amd64-vyos");
        assert_eq!(store.get_str("build_type").unwrap(), "release");
        assert_eq!(
            store.get_str_list("custom_packages").unwrap(),
            vec!["tmux".to_string(), "vim".to_string()]
        );
        assert!(!store.get_bool("debug").unwrap());
        assert_eq!(store.get_str("build_by").unwrap(), "ci@vyos");
        assert_eq!(store.get_str("build_architecture").unwrap(), "amd64");
        assert_eq!(store.get_str("build_target").unwrap(), "generic_iso");
        assert_eq!(
            store.get_str("build_dir").unwrap(),
            paths.build_dir.to_string_lossy()
        );
        assert!(!resolved.legacy_active());
    }

    #[test]
    fn test_build_by_fallback() {
        let dir = tempdir().unwrap();
        let paths = checkout(dir.path());
        fs::write(
            paths.architectures.join("10_build_defaults.toml"),
            "kernel_version = \"5.10.77\"\n",
        )
        .unwrap();
        let registry = discover(&paths).unwrap();

        let resolved =
            resolve(&registry, &paths, &BuildRequest::new("amd64", "generic_iso")).unwrap();
        assert!(resolved.store.get_str("build_by").unwrap().contains('@'));
    }

    #[test]
    fn test_legacy_file_is_lowest_priority() {
        let dir = tempdir().unwrap();
        let paths = checkout(dir.path());
        fs::write(
            &paths.legacy_defaults,
            r#"{"kernel_version": "4.19.0", "vyos_mirror": "http://legacy"}"#,
        )
        .unwrap();
        let registry = discover(&paths).unwrap();

        let resolved =
            resolve(&registry, &paths, &BuildRequest::new("amd64", "generic_iso")).unwrap();
        assert_eq!(resolved.store.get_str("kernel_version").unwrap(), "5.10.77");
        assert_eq!(resolved.store.get_str("vyos_mirror").unwrap(), "http://legacy");
        assert!(resolved.legacy_active());
    }

    #[test]
    fn test_baseline_unchanged_without_legacy_file() {
        let dir = tempdir().unwrap();
        let paths = checkout(dir.path());

        let plain = ModuleRegistry::discover(&paths.architectures).unwrap();
        let with_shim = discover(&paths).unwrap();

        assert_eq!(
            ConfigStore::from_defaults(&plain).to_mapping(),
            ConfigStore::from_defaults(&with_shim).to_mapping()
        );
    }

    /// Every shipped target resolves into a complete build config and its
    /// configure-hook runs against a copy of the checkout's data.
    #[test]
    fn test_shipped_targets() {
        use crate::build_config::BuildConfig;
        use crate::hook::{self, HookContext};
        use crate::prepare::copy_tree;

        let repo = Path::new(env!("CARGO_MANIFEST_DIR"));
        let dir = tempdir().unwrap();
        copy_tree(&repo.join("data"), &dir.path().join("data")).unwrap();
        let paths = BuildPaths::new(dir.path());
        let registry = discover(&paths).unwrap();

        let tree = registry.target_tree();
        assert!(tree["amd64"].contains("generic_iso"));
        assert!(tree["amd64"].contains("aws"));
        assert!(tree["amd64"].contains("vep1400"));
        assert!(tree["arm64"].contains("rpi_cm4"));

        for (architecture, targets) in &tree {
            for target in targets {
                let resolved =
                    resolve(&registry, &paths, &BuildRequest::new(architecture, target)).unwrap();
                let values = resolved.store.to_mapping();
                let config = BuildConfig::from_values(&values).unwrap();
                assert_eq!(&config.build_architecture, architecture);

                hook::run(&HookContext::new(dir.path(), values), &resolved.overlay).unwrap();
            }
        }

        let build = dir.path().join("build/config");
        assert!(build.join("package-lists/vyos-x86.list.chroot").is_file());
        assert!(build
            .join("includes.chroot/etc/cloud/cloud.cfg.d/90_dpkg.cfg")
            .is_file());
        assert!(build
            .join("includes.chroot/etc/systemd/network/10-eth0.link")
            .is_file());
    }

    #[test]
    fn test_aws_inherits_generic_iso_values() {
        let repo = Path::new(env!("CARGO_MANIFEST_DIR"));
        let paths = BuildPaths::new(repo);
        let registry = ModuleRegistry::discover(&paths.architectures).unwrap();

        let resolved =
            resolve(&registry, &paths, &BuildRequest::new("amd64", "aws")).unwrap();
        let store = &resolved.store;
        assert_eq!(store.get_str("kernel_flavor").unwrap(), "amd64-vyos");
        assert_eq!(store.get_str("bootloaders").unwrap(), "syslinux,grub-efi");
        assert_eq!(store.get_str("kernel_version").unwrap(), "5.10.77");
        assert_eq!(
            store.get_str_list("additional_repositories").unwrap().len(),
            2
        );
    }

    #[test]
    fn test_unknown_target_is_reported() {
        let dir = tempdir().unwrap();
        let paths = checkout(dir.path());
        let registry = discover(&paths).unwrap();

        let err = resolve(&registry, &paths, &BuildRequest::new("amd64", "vep4600"))
            .err()
            .unwrap();
        let msg = format!("{:#}", err);
        assert!(msg.contains("cannot configure amd64/vep4600"));
        assert!(msg.contains("generic_iso"));
    }
}
