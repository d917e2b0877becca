//! # Scheduling Policy
//!
//! Stateless and single-purpose pieces the dispatcher composes.
//!
//! # Submodules
//!
//! - `classify` - direction/size to priority class
//! - `pattern` - sequential read detection
//! - `burst` - read-burst controller with cooldown
//! - `throttle` - request aging and write-throttle hysteresis
//! - `priority` - additive read score

mod burst;
mod classify;
mod pattern;
mod priority;
mod throttle;

pub use burst::{BurstController, BurstParams, BurstPhase, BurstState, SavedPolicy};
pub use classify::{classify, ClassThresholds};
pub use pattern::{
    PatternDetector, PatternParams, SEQ_SCORE_DECAY, SEQ_SCORE_MAX, SEQ_SCORE_STEP,
    SEQ_SCORE_THRESHOLD,
};
pub use priority::{priority, ScoreSignals, ScoreWeights};
pub use throttle::{is_aged, ThrottleChange, WriteThrottle};
