//! # Scheduler Configuration
//!
//! - `tunables` - the tunable table with ranges and defaults
//! - `registry` - lock-guarded administrative master copy

mod registry;
mod tunables;

pub use registry::{registry, show, snapshot, store, TunableRegistry};
pub use tunables::{TunableSpec, Tunables, MAX_COALESCE_CAPACITY};
