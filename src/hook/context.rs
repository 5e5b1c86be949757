//! Context handed to configure-hooks.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::Values;

/// Paths and the finalized configuration a hook runs against.
pub struct HookContext {
    /// Repository root. Hook paths are resolved against it.
    pub root: PathBuf,
    /// Finalized build configuration.
    pub config: Values,
}

impl HookContext {
    pub fn new(root: impl Into<PathBuf>, config: Values) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Resolve a hook path against the repository root.
    pub fn path(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Whether the build was configured with `debug = true`.
    pub fn debug(&self) -> bool {
        self.config.get("debug") == Some(&Value::Bool(true))
    }
}
