//! Build preparation from a resolved [`BuildConfig`].
//!
//! Runs after configuration resolution and before `lb build`:
//!
//! 1. Replace `build/config` with the live-build template
//! 2. Write APT sources, keys and package lists, run `lb config`
//! 3. Import local `.deb` packages
//! 4. Stamp the version
//! 5. Add the development package list for development builds
//!
//! The target's configure-hook runs after this, see [`crate::hook`].

pub mod live_build;
pub mod version;

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::build_config::BuildConfig;
use crate::defaults::{BuildPaths, LB_CONFIG_DIR, PACKAGES_CHROOT_DIR, PACKAGE_LISTS_DIR};

/// Run every platform-independent preparation step.
pub fn prepare(config: &BuildConfig, paths: &BuildPaths) -> Result<()> {
    let lb_config = config.build_dir.join(LB_CONFIG_DIR);
    if lb_config.exists() {
        fs::remove_dir_all(&lb_config)
            .with_context(|| format!("failed to remove {}", lb_config.display()))?;
    }
    copy_tree(&paths.live_build_config, &lb_config)?;

    live_build::write(config)?;
    import_local_packages(&paths.local_packages, &config.build_dir)?;
    version::make_version_file(config, paths)?;

    if config.is_development() {
        copy_dev_package_list(config, paths)?;
    }

    Ok(())
}

/// Copy `*.deb` files from `src_dir` into `packages.chroot`. Returns the
/// number of packages imported.
pub fn import_local_packages(src_dir: &Path, build_dir: &Path) -> Result<usize> {
    let dst_dir = build_dir.join(PACKAGES_CHROOT_DIR);
    fs::create_dir_all(&dst_dir)?;

    if !src_dir.is_dir() {
        println!("[SKIP] No local packages in {}", src_dir.display());
        return Ok(0);
    }

    let mut count = 0;
    for entry in fs::read_dir(src_dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("deb") {
            continue;
        }
        if let Some(name) = path.file_name() {
            fs::copy(&path, dst_dir.join(name))
                .with_context(|| format!("failed to import {}", path.display()))?;
            count += 1;
        }
    }

    if count > 0 {
        println!("  Imported {} local package(s)", count);
    }
    Ok(count)
}

fn copy_dev_package_list(config: &BuildConfig, paths: &BuildPaths) -> Result<()> {
    let src = &paths.dev_package_list;
    let Some(name) = src.file_name() else {
        bail!("invalid package list path: {}", src.display());
    };
    let dst_dir = config.build_dir.join(PACKAGE_LISTS_DIR);
    fs::create_dir_all(&dst_dir)?;
    fs::copy(src, dst_dir.join(name))
        .with_context(|| format!("failed to copy {}", src.display()))?;
    Ok(())
}

/// Recursively copy a directory tree.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    if !src.is_dir() {
        bail!("directory not found: {}", src.display());
    }

    for entry in WalkDir::new(src) {
        let entry = entry.with_context(|| format!("walking {}", src.display()))?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dst.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)
                .with_context(|| format!("failed to copy {}", entry.path().display()))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_config::tests::sample_config;
    use tempfile::tempdir;

    #[test]
    fn test_copy_tree() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("live-build-config");
        fs::create_dir_all(src.join("hooks/live")).unwrap();
        fs::write(src.join("hooks/live/01-hook.chroot"), "#!/bin/sh\n").unwrap();
        fs::write(src.join("bootstrap"), "LB_MODE=debian\n").unwrap();

        let dst = dir.path().join("build/config");
        copy_tree(&src, &dst).unwrap();

        assert!(dst.join("hooks/live/01-hook.chroot").is_file());
        assert_eq!(
            fs::read_to_string(dst.join("bootstrap")).unwrap(),
            "LB_MODE=debian\n"
        );
    }

    #[test]
    fn test_copy_tree_missing_source() {
        let dir = tempdir().unwrap();
        assert!(copy_tree(&dir.path().join("missing"), &dir.path().join("out")).is_err());
    }

    #[test]
    fn test_import_local_packages() {
        let dir = tempdir().unwrap();
        let packages = dir.path().join("packages");
        fs::create_dir_all(&packages).unwrap();
        fs::write(packages.join("vyos-1x_1.4_amd64.deb"), "deb").unwrap();
        fs::write(packages.join("README.md"), "not a package").unwrap();
        fs::create_dir(packages.join("nested.deb")).unwrap();

        let build = dir.path().join("build");
        assert_eq!(import_local_packages(&packages, &build).unwrap(), 1);
        let imported = build.join(PACKAGES_CHROOT_DIR);
        assert!(imported.join("vyos-1x_1.4_amd64.deb").is_file());
        assert!(!imported.join("README.md").exists());
    }

    #[test]
    fn test_import_without_packages_dir() {
        let dir = tempdir().unwrap();
        let build = dir.path().join("build");
        assert_eq!(
            import_local_packages(&dir.path().join("packages"), &build).unwrap(),
            0
        );
        assert!(build.join(PACKAGES_CHROOT_DIR).is_dir());
    }

    #[test]
    fn test_dev_package_list() {
        let dir = tempdir().unwrap();
        let paths = BuildPaths::new(dir.path());
        fs::create_dir_all(paths.dev_package_list.parent().unwrap()).unwrap();
        fs::write(&paths.dev_package_list, "gdb\n").unwrap();
        let config = sample_config(&paths.build_dir);

        copy_dev_package_list(&config, &paths).unwrap();
        assert!(paths
            .build_dir
            .join(PACKAGE_LISTS_DIR)
            .join("vyos-dev.list.chroot")
            .is_file());
    }
}
