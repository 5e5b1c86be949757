//! Configure-hooks of target overlays.
//!
//! A hook is the `[[_configure]]` step list of an overlay. Steps run in the
//! order the overlay author wrote them; a `parent` step is the only way a
//! base overlay's hook runs, there is no implicit chaining.

mod context;
mod executor;

pub use context::HookContext;
pub use executor::run;
