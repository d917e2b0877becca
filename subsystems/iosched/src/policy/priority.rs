//! Read priority scoring.
//!
//! Additive score used only to rank reads inside the bounded dispatch scan.
//! Higher wins; ties keep the entry seen first.

use crate::request::{IoRequest, RequestClass, RequestMeta};
#[cfg(feature = "sync-hints")]
use crate::request::RequestFlags;

/// Scoring weights.
///
/// The defaults are hand-tuned and carry no derivation; hosts may replace
/// them wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreWeights {
    /// Rank per class, indexed by [`RequestClass::index`]
    pub class_rank: [i32; RequestClass::COUNT],
    /// Multiplier applied to the class rank
    pub rank_scale: i32,
    /// Base score for requests admitted without metadata
    pub unclassified: i32,
    /// Multiplier for the burst read boost
    pub turbo_scale: i32,
    /// Multiplier for the aging boost
    pub aging_scale: i32,
    /// Multiplier for the sequential boost
    pub seq_scale: i32,
    /// Bonus for synchronous requests
    pub sync_bonus: i32,
    /// Extra bonus for elevated-priority requests
    pub prio_bonus: i32,
}

impl ScoreWeights {
    /// Default weights
    pub const DEFAULT: Self = Self {
        class_rank: [0, 1, 2, 3, 4],
        rank_scale: 10,
        unclassified: 20,
        turbo_scale: 10,
        aging_scale: 15,
        seq_scale: 8,
        sync_bonus: 10,
        prio_bonus: 20,
    };
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Scheduler-wide signals and boost factors feeding the score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSignals {
    /// Burst controller is Active
    pub burst_active: bool,
    /// Pattern detector reports sequential locality
    pub sequential: bool,
    /// `turbo_read_boost` tunable
    pub turbo_read_boost: i32,
    /// `aging_boost_factor` tunable
    pub aging_boost_factor: i32,
    /// `seq_boost_factor` tunable
    pub seq_boost_factor: i32,
}

/// Score one request
pub fn priority(
    weights: &ScoreWeights,
    rq: &IoRequest,
    meta: Option<&RequestMeta>,
    aged: bool,
    signals: &ScoreSignals,
) -> i32 {
    let mut prio = match meta {
        Some(meta) => weights.class_rank[meta.class.index()] * weights.rank_scale,
        None => weights.unclassified,
    };

    if signals.burst_active && rq.is_read() {
        prio += signals.turbo_read_boost * weights.turbo_scale;
    }

    if aged {
        prio += signals.aging_boost_factor * weights.aging_scale;
    }

    if signals.sequential && meta.is_some_and(|m| m.class == RequestClass::LargeRead) {
        prio += signals.seq_boost_factor * weights.seq_scale;
    }

    #[cfg(feature = "sync-hints")]
    {
        if rq.flags.contains(RequestFlags::SYNC) {
            prio += weights.sync_bonus;
        }
        #[cfg(feature = "prio-hint")]
        {
            if rq.flags.contains(RequestFlags::PRIO) {
                prio += weights.prio_bonus;
            }
        }
    }

    prio
}

// =============================================================================
// TESTS
// =============================================================================
