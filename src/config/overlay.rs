//! Architecture modules and their target overlays.
//!
//! An architecture module is a directory under the architectures root; every
//! public `*.toml` file inside it is a target overlay. Sub-directories are data
//! (package lists, cloud-init snippets, hook payloads) and are not walked.
//!
//! # Overlay format
//!
//! ```toml
//! # amd64/aws.toml
//! _base = "generic_iso"          # compose generic_iso underneath
//!
//! [[_configure]]
//! action = "parent"              # run generic_iso's hook first
//!
//! [[_configure]]
//! action = "mkdir"
//! path = "build/config/includes.chroot/etc/cloud/cloud.cfg.d"
//!
//! [[_configure]]
//! action = "copy"
//! from = "data/architectures/amd64/cloud-init/AWS/90_dpkg.cfg"
//! to = "build/config/includes.chroot/etc/cloud/cloud.cfg.d/"
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use super::error::{ConfigError, ConfigResult};
use super::fragment::{read_unit, split_private, unit_name, Values};

/// Private key naming the sibling target this overlay is composed on.
const BASE_KEY: &str = "_base";
/// Private key holding the configure-hook steps.
const HOOK_KEY: &str = "_configure";

/// One step of a configure-hook.
///
/// Paths are relative to the repository root the hook runs in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HookStep {
    /// Run the base overlay's hook at this point.
    Parent,
    /// Create a directory and its parents.
    Mkdir { path: PathBuf },
    /// Copy one file. A `to` ending in `/` or naming a directory keeps the
    /// source file name.
    Copy { from: PathBuf, to: PathBuf },
    /// Copy every regular file in `from` whose extension is `extension`.
    CopyMatching {
        from: PathBuf,
        extension: String,
        to: PathBuf,
    },
}

/// A named, architecture-specific configuration overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetOverlay {
    name: String,
    own: Values,
    base: Option<Arc<TargetOverlay>>,
    hook: Vec<HookStep>,
}

impl TargetOverlay {
    pub fn new(name: impl Into<String>, values: Values) -> Self {
        Self {
            name: name.into(),
            own: values,
            base: None,
            hook: Vec::new(),
        }
    }

    /// Compose this overlay on top of `base`.
    pub fn with_base(mut self, base: Arc<TargetOverlay>) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_hook(mut self, hook: Vec<HookStep>) -> Self {
        self.hook = hook;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective values: the base chain's values with this overlay's own keys
    /// replacing them. Lists are replaced, not concatenated.
    pub fn values(&self) -> Values {
        let mut values = self
            .base
            .as_ref()
            .map(|base| base.values())
            .unwrap_or_default();
        for (key, value) in &self.own {
            values.insert(key.clone(), value.clone());
        }
        values
    }

    /// Values declared in this overlay only.
    pub fn own_values(&self) -> &Values {
        &self.own
    }

    pub fn base(&self) -> Option<&TargetOverlay> {
        self.base.as_deref()
    }

    pub fn hook(&self) -> &[HookStep] {
        &self.hook
    }
}

/// Target overlay as parsed from disk, before `_base` is linked.
struct RawOverlay {
    path: PathBuf,
    own: Values,
    base: Option<String>,
    hook: Vec<HookStep>,
}

impl RawOverlay {
    fn from_file(path: &Path) -> ConfigResult<Self> {
        let (own, mut private) = split_private(path, read_unit(path)?)?;

        let base = match private.remove(BASE_KEY) {
            None => None,
            Some(toml::Value::String(name)) => Some(name),
            Some(_) => return Err(ConfigError::load(path, "_base must be a target name")),
        };

        let hook = match private.remove(HOOK_KEY) {
            None => Vec::new(),
            Some(steps) => Vec::<HookStep>::deserialize(steps)
                .map_err(|e| ConfigError::load(path, format!("invalid _configure: {}", e)))?,
        };

        if base.is_none() && hook.contains(&HookStep::Parent) {
            return Err(ConfigError::load(
                path,
                "configure-hook runs its parent but the overlay has no _base",
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            own,
            base,
            hook,
        })
    }
}

/// A hardware/platform family grouping its target overlays.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchitectureModule {
    name: String,
    targets: BTreeMap<String, Arc<TargetOverlay>>,
}

impl ArchitectureModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            targets: BTreeMap::new(),
        }
    }

    /// Add a target overlay. A later overlay with the same name replaces the
    /// earlier one.
    pub fn with_target(mut self, overlay: TargetOverlay) -> Self {
        self.targets
            .insert(overlay.name().to_string(), Arc::new(overlay));
        self
    }

    /// Load an architecture module from its directory.
    pub fn load(name: impl Into<String>, dir: &Path) -> ConfigResult<Self> {
        let name = name.into();
        let mut raw = BTreeMap::new();

        let entries = fs::read_dir(dir).map_err(|e| ConfigError::io(dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| ConfigError::io(dir, e))?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(target) = unit_name(&path) {
                raw.insert(target, RawOverlay::from_file(&path)?);
            }
        }

        let mut linked = BTreeMap::new();
        for target in raw.keys() {
            let mut visiting = Vec::new();
            link(target, &raw, &mut linked, &mut visiting)?;
        }

        tracing::debug!(
            architecture = %name,
            targets = ?linked.keys().collect::<Vec<_>>(),
            "loaded architecture module"
        );

        Ok(Self {
            name,
            targets: linked,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self, name: &str) -> Option<&Arc<TargetOverlay>> {
        self.targets.get(name)
    }

    /// Ordered set of target names.
    pub fn target_names(&self) -> BTreeSet<String> {
        self.targets.keys().cloned().collect()
    }
}

/// Resolve `_base` references depth-first so every overlay holds its base.
fn link(
    target: &str,
    raw: &BTreeMap<String, RawOverlay>,
    linked: &mut BTreeMap<String, Arc<TargetOverlay>>,
    visiting: &mut Vec<String>,
) -> ConfigResult<Arc<TargetOverlay>> {
    if let Some(done) = linked.get(target) {
        return Ok(Arc::clone(done));
    }

    // Only reachable through a _base reference, so the referrer is on the stack.
    let overlay = raw.get(target).ok_or_else(|| {
        let referrer = visiting.last().and_then(|r| raw.get(r));
        ConfigError::load(
            referrer.map(|r| r.path.clone()).unwrap_or_default(),
            format!("_base target '{}' does not exist", target),
        )
    })?;

    if visiting.iter().any(|t| t == target) {
        visiting.push(target.to_string());
        return Err(ConfigError::load(
            &overlay.path,
            format!("_base cycle: {}", visiting.join(" -> ")),
        ));
    }

    visiting.push(target.to_string());
    let mut built = TargetOverlay::new(target, overlay.own.clone()).with_hook(overlay.hook.clone());
    if let Some(base) = &overlay.base {
        built = built.with_base(link(base, raw, linked, visiting)?);
    }
    visiting.pop();

    let built = Arc::new(built);
    linked.insert(target.to_string(), Arc::clone(&built));
    Ok(built)
}
