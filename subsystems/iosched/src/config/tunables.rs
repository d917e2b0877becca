//! # Tunable Table
//!
//! Every tunable is declared once in [`define_tunables!`], which generates
//! the [`Tunables`] struct, its defaults, the range table and name-based
//! accessors. All values are plain integers in the unit their name carries.

use crate::error::{ConfigError, ConfigResult};

/// Static description of one tunable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunableSpec {
    /// Attribute name
    pub name: &'static str,
    /// Default value
    pub default: i32,
    /// Smallest accepted value
    pub min: i32,
    /// Largest accepted value
    pub max: i32,
}

impl TunableSpec {
    /// Check a candidate value against the range
    pub fn check(&self, value: i64) -> ConfigResult<i32> {
        if value < self.min as i64 || value > self.max as i64 {
            return Err(ConfigError::OutOfRange {
                name: self.name,
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(value as i32)
    }
}

/// Declare the tunable set
macro_rules! define_tunables {
    ($( $(#[$doc:meta])* $name:ident = $default:literal in [$min:literal, $max:literal]; )*) => {
        /// Scheduler tunables.
        ///
        /// A `Tunables` value is an immutable snapshot once handed to a
        /// scheduler; administrative writes build a new snapshot.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct Tunables {
            $( $(#[$doc])* pub $name: i32, )*
        }

        impl Tunables {
            /// Default policy
            pub const DEFAULT: Self = Self { $( $name: $default, )* };

            /// Name, default and range of every tunable, in declaration order
            pub const SPECS: &'static [TunableSpec] = &[
                $( TunableSpec { name: stringify!($name), default: $default, min: $min, max: $max }, )*
            ];

            /// Read a tunable by name
            pub fn get(&self, name: &str) -> Option<i32> {
                match name {
                    $( stringify!($name) => Some(self.$name), )*
                    _ => None,
                }
            }

            fn slot_mut(&mut self, name: &str) -> Option<&mut i32> {
                match name {
                    $( stringify!($name) => Some(&mut self.$name), )*
                    _ => None,
                }
            }
        }

        $( static_assertions::const_assert!($min <= $default && $default <= $max); )*
    };
}

define_tunables! {
    /// Read FIFO expiry (ms)
    read_expire_ms = 200 in [10, 5000];
    /// Write FIFO expiry (ms)
    write_expire_ms = 4000 in [100, 30000];
    /// Expiry for critical reads, and for all reads during a burst (ms)
    critical_read_expire_ms = 30 in [5, 500];
    /// Read-rate counting window (ms)
    burst_window_ms = 80 in [20, 500];
    /// Reads per window that start a burst
    burst_threshold = 8 in [2, 50];
    /// Burst duration (ms)
    burst_decay_ms = 150 in [50, 2000];
    /// Cooldown after a burst before another may start (ms)
    burst_hysteresis_ms = 50 in [0, 500];
    /// Read score boost while a burst is active
    turbo_read_boost = 3 in [0, 10];
    /// Small read ceiling (KiB); half of it bounds critical reads
    small_read_kb = 16 in [4, 128];
    /// Large read floor for sequential detection (KiB)
    large_read_kb = 128 in [32, 1024];
    /// Tiny write ceiling (KiB)
    tiny_write_kb = 4 in [1, 64];
    /// Requests dispatched per batch
    fifo_batch = 24 in [1, 128];
    /// Reads served before a pending write must go
    writes_starved_ratio = 3 in [1, 20];
    /// Same, while a burst is active
    writes_starved_burst = 6 in [1, 20];
    /// Read FIFO entries examined per dispatch
    small_read_scan_depth = 24 in [4, 128];
    /// Write depth that enables throttling
    write_throttle_threshold = 32 in [8, 256];
    /// Coalesce staging delay (ms)
    write_coalesce_delay_ms = 5 in [1, 100];
    /// Staging area capacity
    max_coalesced_writes = 8 in [2, 64];
    /// Largest gap between coalesce neighbours (sectors)
    coalesce_sector_threshold = 256 in [8, 2048];
    /// Age after which a request bypasses prioritisation (ms)
    max_request_age_ms = 1000 in [100, 10000];
    /// Score boost multiplier for aged requests
    aging_boost_factor = 2 in [0, 10];
    /// Largest offset delta still counted as sequential (sectors)
    seq_threshold_sectors = 128 in [16, 1024];
    /// Score boost multiplier for sequential large reads
    seq_boost_factor = 2 in [0, 10];
}

/// Largest staging capacity any configuration may ask for
pub const MAX_COALESCE_CAPACITY: usize = 64;

static_assertions::const_assert!(Tunables::DEFAULT.max_coalesced_writes as usize <= MAX_COALESCE_CAPACITY);

impl Tunables {
    /// Look up the range entry for a name
    pub fn spec(name: &str) -> Option<&'static TunableSpec> {
        Self::SPECS.iter().find(|spec| spec.name == name)
    }

    /// Write a tunable by name; the table is untouched on error
    pub fn set(&mut self, name: &str, value: i64) -> ConfigResult<()> {
        let spec = Self::spec(name).ok_or(ConfigError::UnknownTunable)?;
        let value = spec.check(value)?;
        let slot = self.slot_mut(name).ok_or(ConfigError::UnknownTunable)?;
        *slot = value;
        Ok(())
    }

    /// Parse a decimal string and write it (attribute-file style)
    pub fn store(&mut self, name: &str, text: &str) -> ConfigResult<()> {
        let value: i64 = text.trim().parse().map_err(|_| ConfigError::Parse)?;
        self.set(name, value)
    }

    /// Check every value against its range
    pub fn validate(&self) -> ConfigResult<()> {
        for spec in Self::SPECS {
            let value = self.get(spec.name).ok_or(ConfigError::UnknownTunable)?;
            spec.check(value as i64)?;
        }
        Ok(())
    }

    /// Iterate `(name, value)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, i32)> + '_ {
        Self::SPECS
            .iter()
            .filter_map(move |spec| self.get(spec.name).map(|v| (spec.name, v)))
    }
}

impl Default for Tunables {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        assert_eq!(Tunables::SPECS.len(), 23);
        assert!(Tunables::default().validate().is_ok());
        for spec in Tunables::SPECS {
            assert_eq!(Tunables::DEFAULT.get(spec.name), Some(spec.default));
        }
    }

    #[test]
    fn test_set_in_range() {
        let mut t = Tunables::default();
        t.set("fifo_batch", 1).unwrap();
        assert_eq!(t.fifo_batch, 1);
        t.set("burst_hysteresis_ms", 0).unwrap();
        assert_eq!(t.burst_hysteresis_ms, 0);
    }

    #[test]
    fn test_set_out_of_range_keeps_value() {
        let mut t = Tunables::default();
        let err = t.set("small_read_scan_depth", 3).unwrap_err();
        assert_eq!(
            err,
            ConfigError::OutOfRange {
                name: "small_read_scan_depth",
                value: 3,
                min: 4,
                max: 128
            }
        );
        assert_eq!(t.small_read_scan_depth, 24);
        assert!(t.set("write_expire_ms", 30001).is_err());
        assert_eq!(t, Tunables::DEFAULT);
    }

    #[test]
    fn test_unknown_and_parse() {
        let mut t = Tunables::default();
        assert_eq!(t.set("no_such", 1), Err(ConfigError::UnknownTunable));
        assert_eq!(t.store("fifo_batch", "abc"), Err(ConfigError::Parse));
        t.store("fifo_batch", " 16\n").unwrap();
        assert_eq!(t.fifo_batch, 16);
        assert_eq!(t.get("no_such"), None);
    }

    #[test]
    fn test_validate_catches_direct_writes() {
        let mut t = Tunables::default();
        t.max_coalesced_writes = 65;
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_iter_order() {
        let t = Tunables::default();
        let first = t.iter().next().unwrap();
        assert_eq!(first, ("read_expire_ms", 200));
        assert_eq!(t.iter().count(), Tunables::SPECS.len());
    }
}
