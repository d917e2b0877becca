//! Scheduler statistics.

/// Per-queue scheduling counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedStats {
    /// Requests admitted
    pub admitted: u64,
    /// Requests admitted without metadata
    pub degraded: u64,
    /// Reads dispatched
    pub dispatched_reads: u64,
    /// Writes dispatched
    pub dispatched_writes: u64,
    /// Dispatches served from the batch cursor
    pub batched: u64,
    /// Dispatches of requests past their maximum age
    pub aged: u64,
    /// Writes chosen because reads hit the starvation ratio
    pub starved_writes: u64,
    /// Staging flushes
    pub coalesce_flushes: u64,
    /// Staged writes merged away during flushes
    pub coalesce_merges: u64,
    /// Front-merge notifications
    pub front_merges: u64,
    /// Request-merge notifications
    pub merges: u64,
    /// Burst activations
    pub bursts: u64,
    /// Write-throttle engagements
    pub throttles: u64,
}

impl SchedStats {
    /// Total dispatches
    pub fn dispatched(&self) -> u64 {
        self.dispatched_reads + self.dispatched_writes
    }

    /// Fraction of dispatches that were reads
    pub fn read_ratio(&self) -> f64 {
        let total = self.dispatched();
        if total == 0 {
            return 0.0;
        }
        self.dispatched_reads as f64 / total as f64
    }
}

// =============================================================================
// TESTS
// =============================================================================
