//! Error taxonomy for the configuration layer.
//!
//! Every variant is fatal: fragments are static files, so there is nothing to
//! retry against. The CLI prints the message and exits non-zero.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for the configuration layer.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A fragment or target overlay could not be read or parsed.
    #[error("failed to load config fragment {}: {reason}", path.display())]
    FragmentLoad { path: PathBuf, reason: String },

    #[error("architecture '{0}' registered twice")]
    DuplicateArchitecture(String),

    #[error("default fragment '{0}' registered twice")]
    DuplicateFragment(String),

    #[error(
        "architecture '{architecture}' not found, available: {}",
        join_names(available)
    )]
    ArchitectureNotFound {
        architecture: String,
        available: Vec<String>,
    },

    #[error(
        "target '{target}' not found for architecture '{architecture}', available: {}",
        join_names(available)
    )]
    TargetNotFound {
        architecture: String,
        target: String,
        available: Vec<String>,
    },

    /// Raised when a key is read that no fragment defined. Carries the whole
    /// mapping so the missing default can be spotted.
    #[error("config option '{key}' not found in any loaded config\ncurrent config:\n{dump}")]
    KeyNotFound { key: String, dump: String },

    #[error("config option '{key}' has the wrong type, expected {expected}")]
    InvalidValue { key: String, expected: &'static str },

    #[error("legacy config {} is not a valid JSON object: {source}", path.display())]
    LegacyConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::FragmentLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build an `ArchitectureNotFound` listing every known architecture.
    pub(crate) fn unknown_architecture(
        architecture: &str,
        tree: &BTreeMap<String, BTreeSet<String>>,
    ) -> Self {
        Self::ArchitectureNotFound {
            architecture: architecture.to_string(),
            available: tree.keys().cloned().collect(),
        }
    }
}

fn join_names(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}
