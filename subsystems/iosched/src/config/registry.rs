//! # Tunable Registry
//!
//! Administrative side of the configuration. Writes land in a lock-guarded
//! master copy; schedulers never read it directly; their host takes a
//! [`snapshot`](TunableRegistry::snapshot) and hands it to
//! `apply_configuration` between scheduling calls.

use core::sync::atomic::{AtomicU64, Ordering};

use spin::RwLock;

use super::Tunables;
use crate::error::{ConfigError, ConfigResult};

/// Master tunable table
#[derive(Debug)]
pub struct TunableRegistry {
    /// Current values
    values: RwLock<Tunables>,
    /// Bumped after every successful write
    generation: AtomicU64,
}

impl TunableRegistry {
    /// Create a registry holding the defaults
    pub const fn new() -> Self {
        Self {
            values: RwLock::new(Tunables::DEFAULT),
            generation: AtomicU64::new(0),
        }
    }

    /// Read one tunable
    pub fn show(&self, name: &str) -> ConfigResult<i32> {
        self.values.read().get(name).ok_or(ConfigError::UnknownTunable)
    }

    /// Parse and write one tunable
    pub fn store(&self, name: &str, text: &str) -> ConfigResult<()> {
        let value: i64 = text.trim().parse().map_err(|_| ConfigError::Parse)?;
        self.set(name, value)
    }

    /// Write one tunable
    pub fn set(&self, name: &str, value: i64) -> ConfigResult<()> {
        let mut values = self.values.write();
        values.set(name, value)?;
        drop(values);

        self.generation.fetch_add(1, Ordering::Release);
        log::debug!("iosched: tunable {} = {}", name, value);
        Ok(())
    }

    /// Copy of the current table
    pub fn snapshot(&self) -> Tunables {
        *self.values.read()
    }

    /// Write counter; a change means a newer snapshot is available
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Restore every tunable to its default
    pub fn reset(&self) {
        *self.values.write() = Tunables::DEFAULT;
        self.generation.fetch_add(1, Ordering::Release);
    }
}

impl Default for TunableRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global tunable registry
static REGISTRY: TunableRegistry = TunableRegistry::new();

/// Get the global tunable registry
pub fn registry() -> &'static TunableRegistry {
    &REGISTRY
}

/// Read a global tunable (convenience function)
pub fn show(name: &str) -> ConfigResult<i32> {
    REGISTRY.show(name)
}

/// Write a global tunable (convenience function)
pub fn store(name: &str, text: &str) -> ConfigResult<()> {
    REGISTRY.store(name, text)
}

/// Snapshot the global tunables (convenience function)
pub fn snapshot() -> Tunables {
    REGISTRY.snapshot()
}

// =============================================================================
// TESTS
// =============================================================================
