//! Diagnostic logging.
//!
//! User-facing progress is printed directly; `tracing` carries the diagnostic
//! detail (discovery, merges, commands run). `RUST_LOG` overrides the level.

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Install the stderr subscriber. Later calls are ignored.
pub fn init(verbose: bool) {
    INIT.call_once(|| {
        let default = if verbose { "vyos_build=debug" } else { "warn" };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(verbose)
            .try_init();
    });
}
