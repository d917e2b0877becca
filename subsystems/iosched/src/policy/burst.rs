//! # Burst Controller
//!
//! Detects read bursts and temporarily shifts the policy toward read
//! latency.
//!
//! ```text
//!          reads >= threshold              now >= deadline
//!   Idle ─────────────────────▶ Active ─────────────────────▶ Cooldown
//!    ▲                                                           │
//!    └───────────────────── now >= cooldown_until ◀──────────────┘
//! ```
//!
//! The window and the Cooldown→Idle edge advance on read admission; the
//! Active→Cooldown edge is checked on every dispatch tick. While in
//! Cooldown the threshold may be met without re-entering Active.

use crate::time::Timestamp;

/// Parameters for the burst controller, in milliseconds and counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstParams {
    /// Counting window
    pub window_ms: u64,
    /// Reads per window that start a burst
    pub threshold: u32,
    /// Burst duration
    pub decay_ms: u64,
    /// Cooldown after a burst
    pub hysteresis_ms: u64,
}

/// Policy values displaced by a burst and restored when it ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedPolicy {
    /// Write-starvation ratio before the burst
    pub writes_starved: u32,
    /// Read expiry before the burst (ms)
    pub read_expire_ms: u32,
}

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstState {
    /// No burst
    Idle,
    /// Burst in progress
    Active {
        /// Burst end
        deadline: Timestamp,
        /// Configuration to restore at the end
        saved: SavedPolicy,
    },
    /// Recently ended burst; activation suppressed
    Cooldown {
        /// Cooldown end
        until: Timestamp,
    },
}

/// State name without payload, for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstPhase {
    /// No burst
    Idle,
    /// Burst in progress
    Active,
    /// Recently ended burst
    Cooldown,
}

impl BurstState {
    /// Payload-free view
    pub fn phase(&self) -> BurstPhase {
        match self {
            Self::Idle => BurstPhase::Idle,
            Self::Active { .. } => BurstPhase::Active,
            Self::Cooldown { .. } => BurstPhase::Cooldown,
        }
    }
}

/// Read-rate burst detector
#[derive(Debug, Clone)]
pub struct BurstController {
    state: BurstState,
    window_start: Option<Timestamp>,
    read_count: u32,
}

impl BurstController {
    /// Create an idle controller
    pub fn new() -> Self {
        Self {
            state: BurstState::Idle,
            window_start: None,
            read_count: 0,
        }
    }

    /// Account an admitted read.
    ///
    /// `current` is the policy in force right now. Returns `true` when this
    /// read started a burst; `current` is then owned by the controller until
    /// [`decay`](Self::decay) gives it back.
    pub fn on_read(&mut self, now: Timestamp, params: &BurstParams, current: SavedPolicy) -> bool {
        if let BurstState::Cooldown { until } = self.state {
            if now.is_at_or_after(until) {
                self.state = BurstState::Idle;
            }
        }

        let window_expired = match self.window_start {
            None => true,
            Some(start) => now.is_after(start.add_millis(params.window_ms)),
        };
        if window_expired {
            self.window_start = Some(now);
            self.read_count = 0;
        }

        self.read_count = self.read_count.saturating_add(1);

        if self.state == BurstState::Idle && self.read_count >= params.threshold {
            self.state = BurstState::Active {
                deadline: now.add_millis(params.decay_ms),
                saved: current,
            };
            log::debug!(
                "iosched: burst start ({} reads in window), until {}",
                self.read_count,
                now.add_millis(params.decay_ms)
            );
            return true;
        }

        false
    }

    /// End an expired burst. Returns the saved policy when Active→Cooldown
    /// fires at `now`.
    pub fn decay(&mut self, now: Timestamp, params: &BurstParams) -> Option<SavedPolicy> {
        let BurstState::Active { deadline, saved } = self.state else {
            return None;
        };
        if !now.is_at_or_after(deadline) {
            return None;
        }

        let until = now.add_millis(params.hysteresis_ms);
        self.state = BurstState::Cooldown { until };
        self.read_count = 0;
        log::debug!("iosched: burst end, cooldown until {}", until);
        Some(saved)
    }

    /// Replace the policy an active burst will restore
    pub fn update_saved(&mut self, policy: SavedPolicy) {
        if let BurstState::Active { saved, .. } = &mut self.state {
            *saved = policy;
        }
    }

    /// Policy an active burst will restore
    pub fn saved(&self) -> Option<SavedPolicy> {
        match self.state {
            BurstState::Active { saved, .. } => Some(saved),
            _ => None,
        }
    }

    /// Current state
    pub fn state(&self) -> BurstState {
        self.state
    }

    /// Burst in progress
    pub fn is_active(&self) -> bool {
        matches!(self.state, BurstState::Active { .. })
    }

    /// Reads counted in the current window
    pub fn read_count(&self) -> u32 {
        self.read_count
    }
}

impl Default for BurstController {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
