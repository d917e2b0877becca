//! Request classification.

use crate::config::Tunables;
use crate::request::{Direction, RequestClass};

/// Size thresholds used by [`classify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassThresholds {
    /// Small read ceiling (KiB)
    pub small_read_kb: u32,
    /// Tiny write ceiling (KiB)
    pub tiny_write_kb: u32,
}

impl ClassThresholds {
    /// Extract thresholds from a tunable snapshot
    pub fn from_tunables(tunables: &Tunables) -> Self {
        Self {
            small_read_kb: tunables.small_read_kb as u32,
            tiny_write_kb: tunables.tiny_write_kb as u32,
        }
    }
}

/// Map direction and size to a priority class.
///
/// Reads up to half the small-read ceiling are critical, up to the ceiling
/// small, anything larger large. Writes up to the tiny ceiling are tiny.
pub fn classify(direction: Direction, size_bytes: u64, thresholds: &ClassThresholds) -> RequestClass {
    let kb = size_bytes >> 10;

    match direction {
        Direction::Read => {
            if kb <= (thresholds.small_read_kb >> 1) as u64 {
                RequestClass::CriticalRead
            } else if kb <= thresholds.small_read_kb as u64 {
                RequestClass::SmallRead
            } else {
                RequestClass::LargeRead
            }
        },
        Direction::Write => {
            if kb <= thresholds.tiny_write_kb as u64 {
                RequestClass::TinyWrite
            } else {
                RequestClass::NormalWrite
            }
        },
    }
}

// =============================================================================
// TESTS
// =============================================================================
