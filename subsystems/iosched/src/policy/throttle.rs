//! Request aging and write-throttle hysteresis.

use crate::request::RequestMeta;
use crate::time::Timestamp;

/// Request has waited longer than `max_age_ms`
#[inline]
pub fn is_aged(meta: &RequestMeta, now: Timestamp, max_age_ms: u64) -> bool {
    now.is_after(meta.enqueue_time.add_millis(max_age_ms))
}

/// Write-throttle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleChange {
    /// Depth rose above the threshold
    Engaged,
    /// Depth fell to half the threshold or below
    Released,
}

/// Two-threshold write-pressure controller
#[derive(Debug, Clone, Default)]
pub struct WriteThrottle {
    active: bool,
}

impl WriteThrottle {
    /// Create an inactive throttle
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-evaluate against the current write depth
    pub fn update(&mut self, depth: usize, threshold: usize) -> Option<ThrottleChange> {
        if !self.active && depth > threshold {
            self.active = true;
            return Some(ThrottleChange::Engaged);
        }
        if self.active && depth <= threshold / 2 {
            self.active = false;
            return Some(ThrottleChange::Released);
        }
        None
    }

    /// Throttle engaged
    pub fn is_active(&self) -> bool {
        self.active
    }
}

// =============================================================================
// TESTS
// =============================================================================
