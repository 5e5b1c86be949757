//! Layered build configuration.
//!
//! Configuration is assembled from TOML units under `data/architectures/`:
//!
//! 1. [`ModuleRegistry::discover`] scans the root once. Files become default
//!    [`Fragment`]s, directories become [`ArchitectureModule`]s holding
//!    [`TargetOverlay`]s. The optional legacy `defaults.json` is folded in as
//!    the lowest-priority fragment ([`legacy`]).
//! 2. [`ConfigStore::from_defaults`] merges the default fragments in lexical
//!    name order into the baseline.
//! 3. [`TargetResolver::load`] applies one architecture/target overlay on top
//!    and hands back the overlay so its configure-hook can run.
//!
//! # Usage
//!
//! ```rust,ignore
//! use vyos_build::config::{ConfigStore, ModuleRegistry, TargetResolver};
//!
//! let registry = ModuleRegistry::discover(Path::new("data/architectures"))?
//!     .with_legacy_config(Path::new("data/defaults.json"))?;
//! let mut store = ConfigStore::from_defaults(&registry);
//! let overlay = TargetResolver::new(&registry).load(&mut store, "amd64", "generic_iso")?;
//! ```

mod error;
mod fragment;
pub mod legacy;
mod overlay;
mod registry;
mod resolver;
mod store;

pub use error::{ConfigError, ConfigResult};
pub use fragment::{is_private, unit_name, Fragment, Values, UNIT_EXTENSION};
pub use overlay::{ArchitectureModule, HookStep, TargetOverlay};
pub use registry::ModuleRegistry;
pub use resolver::TargetResolver;
pub use store::ConfigStore;
