//! Sequential read detection.
//!
//! Two-sample locality estimator: consecutive large reads close to each
//! other raise a bounded score, anything else lets it decay slowly, so a
//! single seek does not flip the verdict.

use crate::request::IoRequest;

/// Score gained per sequential large read
pub const SEQ_SCORE_STEP: u32 = 8;

/// Score lost per non-sequential read
pub const SEQ_SCORE_DECAY: u32 = 3;

/// Score ceiling
pub const SEQ_SCORE_MAX: u32 = 255;

/// Score above which the stream counts as sequential
pub const SEQ_SCORE_THRESHOLD: u32 = 96;

/// Parameters for [`PatternDetector::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternParams {
    /// Largest offset delta still counted as sequential (sectors)
    pub seq_threshold_sectors: u64,
    /// Large read floor (KiB)
    pub large_read_kb: u32,
}

/// Read locality tracker
#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    /// Previous read's start sector, `None` before the first read
    last_sector: Option<u64>,
    /// Previous read was large
    last_was_large: bool,
    /// Locality score
    seq_score: u32,
    /// Derived verdict
    is_sequential: bool,
}

impl PatternDetector {
    /// Create new detector
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed an admitted request. Writes are ignored.
    pub fn update(&mut self, rq: &IoRequest, params: &PatternParams) {
        if !rq.is_read() {
            return;
        }

        let is_large = rq.kb() >= params.large_read_kb;

        let Some(last) = self.last_sector else {
            self.last_sector = Some(rq.sector);
            self.last_was_large = is_large;
            return;
        };

        let delta = rq.sector.abs_diff(last);

        if delta <= params.seq_threshold_sectors && is_large && self.last_was_large {
            self.seq_score = (self.seq_score + SEQ_SCORE_STEP).min(SEQ_SCORE_MAX);
        } else {
            self.seq_score = self.seq_score.saturating_sub(SEQ_SCORE_DECAY);
        }
        self.is_sequential = self.seq_score > SEQ_SCORE_THRESHOLD;

        self.last_sector = Some(rq.sector);
        self.last_was_large = is_large;
    }

    /// Current locality score
    pub fn seq_score(&self) -> u32 {
        self.seq_score
    }

    /// Stream is sequential
    pub fn is_sequential(&self) -> bool {
        self.is_sequential
    }
}

// =============================================================================
// TESTS
// =============================================================================
