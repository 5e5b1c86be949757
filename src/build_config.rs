//! Typed view of the resolved configuration and its JSON snapshot.
//!
//! The snapshot written after resolution is the only thing the preparation
//! steps read; they never see the store or the fragments.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Values;

/// `release` or `development`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    Release,
    Development,
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildType::Release => write!(f, "release"),
            BuildType::Development => write!(f, "development"),
        }
    }
}

/// Options the preparation steps rely on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub build_architecture: String,
    #[serde(default)]
    pub build_target: Option<String>,
    pub kernel_flavor: String,
    pub kernel_version: String,
    pub bootloaders: String,
    pub debian_distribution: String,
    pub debian_mirror: String,
    pub debian_security_mirror: String,
    pub vyos_mirror: String,
    pub vyos_branch: String,
    #[serde(default)]
    pub additional_repositories: Vec<String>,
    #[serde(default)]
    pub custom_apt_key: Vec<PathBuf>,
    #[serde(default)]
    pub custom_packages: Vec<String>,
    pub build_type: BuildType,
    pub build_by: String,
    pub release_train: String,
    pub build_dir: PathBuf,
    #[serde(default)]
    pub debug: bool,
    /// Release version, required for release builds.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub build_comment: String,
}

impl BuildConfig {
    /// Build the typed view from a resolved mapping.
    pub fn from_values(values: &Values) -> Result<Self> {
        let config: Self = serde_json::from_value(Value::Object(values.clone()))
            .context("resolved configuration is missing required options")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.build_type == BuildType::Release && self.version.is_none() {
            bail!("release builds need an explicit version (--version)");
        }
        Ok(())
    }

    /// Read a snapshot written by [`write_snapshot`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| {
            format!(
                "build config {} not found, run 'vyos-build configure' first",
                path.display()
            )
        })?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse build config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.build_type == BuildType::Development
    }
}

/// Write the resolved mapping as pretty-printed JSON.
pub fn write_snapshot(path: &Path, values: &Values) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(values)?;
    fs::write(path, json + "\n")
        .with_context(|| format!("failed to write build config {}", path.display()))
}
