//! VyOS ISO builder library.
//!
//! Resolves the layered build configuration (defaults, architecture and
//! target overlays) and prepares the live-build tree from it.
//!
//! - [`config`]: fragment discovery, merging and target resolution
//! - [`pipeline`]: one build request from discovery to finalized store
//! - [`build_config`]: typed snapshot read by the preparation steps
//! - [`prepare`]: APT sources, package lists, version stamping, `lb config`
//! - [`hook`]: per-target configure-hooks

pub mod build_config;
pub mod config;
pub mod defaults;
pub mod git;
pub mod hook;
pub mod logging;
pub mod pipeline;
pub mod prepare;
pub mod process;
