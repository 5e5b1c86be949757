//! Version stamping.
//!
//! Creates the version files included in the image and read by
//! `show version` and the install/upgrade scripts:
//!
//! - `usr/share/vyos/version.json` (chroot includes)
//! - `opt/vyatta/etc/version` (chroot includes, old `Version: X` format)
//! - `usr/lib/os-release` (chroot includes)
//! - `version` in the build directory, used for the ISO file name

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::build_config::{BuildConfig, BuildType};
use crate::defaults::{BuildPaths, CHROOT_INCLUDES_DIR};
use crate::git::GitInfo;

/// Contents of `version.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionData {
    pub version: String,
    pub built_by: String,
    pub built_on: String,
    pub build_uuid: String,
    pub build_git: String,
    pub build_branch: String,
    pub release_train: String,
    pub lts_build: bool,
    pub build_comment: String,
}

impl VersionData {
    /// Assemble version data for a build started at `now`.
    pub fn new(
        config: &BuildConfig,
        git: &GitInfo,
        versions_file: &Path,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let timestamp = now.format("%Y%m%d%H%M").to_string();

        let version = match config.build_type {
            BuildType::Development => development_version(&git.branch, versions_file, &timestamp),
            BuildType::Release => config
                .version
                .clone()
                .context("release builds need an explicit version (--version)")?,
        };

        Ok(Self {
            version,
            built_by: config.build_by.clone(),
            built_on: now.format("%a %d %b %Y %H:%M UTC").to_string(),
            build_uuid: Uuid::new_v4().to_string(),
            build_git: git.commit.clone(),
            build_branch: git.branch.clone(),
            release_train: config.release_train.clone(),
            lts_build: config.build_type == BuildType::Release,
            build_comment: config.build_comment.clone(),
        })
    }

    /// `/usr/lib/os-release` for the image.
    pub fn os_release(&self, codename: &str) -> String {
        format!(
            "PRETTY_NAME=\"VyOS {version} ({train})\"\n\
             NAME=\"VyOS\"\n\
             VERSION_ID=\"{version}\"\n\
             VERSION=\"{version} ({train})\"\n\
             VERSION_CODENAME={codename}\n\
             ID=vyos\n\
             HOME_URL=\"https://vyos.io\"\n\
             SUPPORT_URL=\"https://support.vyos.io\"\n\
             BUG_REPORT_URL=\"https://phabricator.vyos.net\"\n",
            version = self.version,
            train = self.release_train,
            codename = codename,
        )
    }

    /// Write every version file for this build.
    pub fn write(&self, config: &BuildConfig) -> Result<()> {
        let includes = config.build_dir.join(CHROOT_INCLUDES_DIR);

        let json = serde_json::to_string(self)?;
        write_file(&includes.join("usr/share/vyos/version.json"), &json)?;
        write_file(
            &includes.join("opt/vyatta/etc/version"),
            &format!("Version: {}\n", self.version),
        )?;
        write_file(
            &includes.join("usr/lib/os-release"),
            &self.os_release(&config.debian_distribution),
        )?;
        write_file(&config.build_dir.join("version"), &format!("{}\n", self.version))?;

        Ok(())
    }
}

/// `<branch version>-rolling-<timestamp>`, or `999.<timestamp>` when the
/// branch has no entry in the versions file.
fn development_version(branch: &str, versions_file: &Path, timestamp: &str) -> String {
    match branch_version(branch, versions_file) {
        Ok(version) => format!("{}-rolling-{}", version, timestamp),
        Err(e) => {
            tracing::warn!(error = %e, "falling back to default development version");
            println!(
                "Could not build a version string specific to git branch, falling back to default: {:#}",
                e
            );
            format!("999.{}", timestamp)
        }
    }
}

fn branch_version(branch: &str, versions_file: &Path) -> Result<String> {
    if branch.is_empty() {
        anyhow::bail!("git branch could not be determined");
    }
    let text = fs::read_to_string(versions_file)
        .with_context(|| format!("failed to read {}", versions_file.display()))?;
    let mapping: HashMap<String, String> = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", versions_file.display()))?;
    mapping
        .get(branch)
        .cloned()
        .with_context(|| format!("no version for branch '{}'", branch))
}

/// Stamp the build: read git state, assemble the version and write the files.
pub fn make_version_file(config: &BuildConfig, paths: &BuildPaths) -> Result<VersionData> {
    let git = GitInfo::read_or_default(&paths.base_dir);
    let data = VersionData::new(config, &git, &paths.versions, Utc::now())?;
    data.write(config)?;
    println!("  Version: {}", data.version);
    Ok(data)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
