//! Host merge collaborator.

use crate::request::IoRequest;

/// Default merged-request ceiling (sectors, 512 KiB)
pub const DEFAULT_MAX_MERGE_SECTORS: u32 = 1024;

/// Physically merges two queued requests on behalf of the scheduler.
///
/// Called by the coalesce flush for staged neighbours. On success the
/// implementation has folded `back` into `front` (updating `front` in
/// place) and `back` ceases to exist as a separate request.
pub trait RequestMerger {
    /// Attempt to merge `back` into `front`
    fn try_merge(&mut self, front: &mut IoRequest, back: &IoRequest) -> bool;
}

/// Merges requests that are exactly contiguous and fit a size ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContiguousMerger {
    /// Largest merged request (sectors)
    pub max_sectors: u32,
}

impl ContiguousMerger {
    /// Create a merger with a size ceiling
    pub const fn new(max_sectors: u32) -> Self {
        Self { max_sectors }
    }
}

impl Default for ContiguousMerger {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MERGE_SECTORS)
    }
}

impl RequestMerger for ContiguousMerger {
    fn try_merge(&mut self, front: &mut IoRequest, back: &IoRequest) -> bool {
        if front.direction != back.direction || front.end_sector() != back.sector {
            return false;
        }

        let Some(total) = front.nr_sectors.checked_add(back.nr_sectors) else {
            return false;
        };
        if total > self.max_sectors {
            return false;
        }

        front.nr_sectors = total;
        front.flags |= back.flags;
        true
    }
}

// =============================================================================
// TESTS
// =============================================================================
