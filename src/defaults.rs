//! Fixed repository layout and build defaults.
//!
//! Every path the builder touches is derived from one base directory (the
//! checkout root) through [`BuildPaths`].

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Root of the configuration units, relative to the checkout.
pub const ARCHITECTURES_DIR: &str = "data/architectures";

/// Deprecated flat configuration file.
pub const LEGACY_DEFAULTS_FILE: &str = "data/defaults.json";

/// Branch name to release version mapping.
pub const VERSIONS_FILE: &str = "data/versions";

/// Template live-build configuration copied into the build directory.
pub const LIVE_BUILD_CONFIG_DIR: &str = "data/live-build-config";

/// Extra package list installed into development images.
pub const DEV_PACKAGE_LIST: &str = "data/package-lists/vyos-dev.list.chroot";

/// Locally built `.deb` packages to include in the image.
pub const LOCAL_PACKAGES_DIR: &str = "packages";

pub const BUILD_DIR: &str = "build";

/// Snapshot of the resolved configuration, inside the build directory.
pub const BUILD_CONFIG_FILE: &str = "build-config.json";

// Paths below are relative to the build directory.

pub const LB_CONFIG_DIR: &str = "config";
pub const CHROOT_INCLUDES_DIR: &str = "config/includes.chroot";
pub const ARCHIVES_DIR: &str = "config/archives";
pub const PACKAGE_LISTS_DIR: &str = "config/package-lists";
pub const PACKAGES_CHROOT_DIR: &str = "config/packages.chroot";
pub const VYOS_REPO_FILE: &str = "config/archives/vyos.list.chroot";
pub const CUSTOM_REPO_FILE: &str = "config/archives/custom.list.chroot";
pub const CUSTOM_PACKAGE_LIST_FILE: &str = "config/package-lists/custom.list.chroot";

/// Paths used while configuring and preparing a build.
#[derive(Debug, Clone)]
pub struct BuildPaths {
    /// Checkout root
    pub base_dir: PathBuf,
    /// Configuration units
    pub architectures: PathBuf,
    /// Legacy `defaults.json`
    pub legacy_defaults: PathBuf,
    /// Branch to version mapping
    pub versions: PathBuf,
    /// live-build template directory
    pub live_build_config: PathBuf,
    /// Development package list
    pub dev_package_list: PathBuf,
    /// Local `.deb` packages
    pub local_packages: PathBuf,
    /// Build directory
    pub build_dir: PathBuf,
    /// Resolved configuration snapshot
    pub build_config: PathBuf,
}

impl BuildPaths {
    pub fn new(base_dir: &Path) -> Self {
        let build_dir = base_dir.join(BUILD_DIR);
        Self {
            base_dir: base_dir.to_path_buf(),
            architectures: base_dir.join(ARCHITECTURES_DIR),
            legacy_defaults: base_dir.join(LEGACY_DEFAULTS_FILE),
            versions: base_dir.join(VERSIONS_FILE),
            live_build_config: base_dir.join(LIVE_BUILD_CONFIG_DIR),
            dev_package_list: base_dir.join(DEV_PACKAGE_LIST),
            local_packages: base_dir.join(LOCAL_PACKAGES_DIR),
            build_config: build_dir.join(BUILD_CONFIG_FILE),
            build_dir,
        }
    }
}

/// Default `build_by` value: `user@host` of the machine running the build.
pub fn default_build_by() -> String {
    let user = env::var("USER")
        .or_else(|_| env::var("LOGNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let host = fs::read_to_string("/proc/sys/kernel/hostname")
        .or_else(|_| fs::read_to_string("/etc/hostname"))
        .map(|h| h.trim().to_string())
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "localhost".to_string());
    format!("{}@{}", user, host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_derive_from_base() {
        let paths = BuildPaths::new(Path::new("/src/vyos-build"));
        assert_eq!(
            paths.architectures,
            PathBuf::from("/src/vyos-build/data/architectures")
        );
        assert_eq!(
            paths.build_config,
            PathBuf::from("/src/vyos-build/build/build-config.json")
        );
        assert_eq!(paths.build_dir, PathBuf::from("/src/vyos-build/build"));
    }

    #[test]
    fn test_default_build_by_shape() {
        let by = default_build_by();
        let (user, host) = by.split_once('@').unwrap();
        assert!(!user.is_empty());
        assert!(!host.is_empty());
    }
}
