//! # Helix Latency-Oriented I/O Scheduler
//!
//! Block-layer scheduling policy for interactive, latency-sensitive
//! workloads: small reads that block a frame or a UI thread are served ahead
//! of bulk traffic, writes are batched and coalesced, and nothing waits
//! forever.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        HELIX I/O SCHEDULER                           │
//! │                                                                      │
//! │   admit(rq, now)                                                     │
//! │        │                                                             │
//! │        ▼                                                             │
//! │   ┌──────────┐    ┌──────────┐    ┌──────────────┐                   │
//! │   │ Classify │──▶ │ Pattern  │──▶ │ Burst Ctrl   │                   │
//! │   └──────────┘    └──────────┘    │ Idle/Active/ │                   │
//! │        │                          │ Cooldown     │                   │
//! │        │ tiny write               └──────────────┘                   │
//! │        ▼                                                             │
//! │   ┌──────────┐   flush    ┌──────────────────────────────────────┐   │
//! │   │ Staging  │──────────▶ │ READ FIFO + index │ WRITE FIFO + index│   │
//! │   └──────────┘            └──────────────────────────────────────┘   │
//! │                                        │                             │
//! │                                        ▼                             │
//! │   dispatch(now) ─▶ batch cursor ─▶ direction (starvation ratio)      │
//! │                                   ─▶ best read / expired write       │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Request Classes
//!
//! | Class        | Rule (defaults)            | Treatment                     |
//! |--------------|----------------------------|-------------------------------|
//! | CriticalRead | read ≤ 8 KiB               | 30 ms expiry, served at head  |
//! | SmallRead    | read ≤ 16 KiB              | scored                        |
//! | LargeRead    | larger reads               | scored, sequential boost      |
//! | TinyWrite    | write ≤ 4 KiB              | staged for coalescing         |
//! | NormalWrite  | larger writes              | FIFO and batch order          |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use helix_iosched::{IoRequest, IoScheduler, Timestamp};
//!
//! let mut sched = IoScheduler::new(helix_iosched::config::snapshot())?;
//! sched.admit(IoRequest::read(1, 2048, 16), Timestamp::from_millis(0));
//!
//! while let Some(rq) = sched.dispatch(Timestamp::from_millis(1)) {
//!     device.submit(rq);
//! }
//! ```
//!
//! ## Features
//!
//! - `sync-hints` (default): score bonus for synchronous requests
//! - `prio-hint` (default): score bonus for elevated-priority requests
//! - `critical-queue`: dedicated FIFO for critical reads

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

// =============================================================================
// EXTERNAL DEPENDENCIES
// =============================================================================

extern crate alloc;

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

/// Tunables and the administrative registry
pub mod config;

/// Error types
pub mod error;

/// Classification, pattern, burst, throttle and scoring
pub mod policy;

/// Request model
pub mod request;

/// Per-queue scheduler
pub mod sched;

/// Scheduling counters
pub mod stats;

/// Scheduler clock types
pub mod time;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use config::{Tunables, TunableRegistry, MAX_COALESCE_CAPACITY};
pub use error::{ConfigError, ConfigResult, IoSchedError, IoSchedResult};
pub use policy::{BurstPhase, ScoreWeights};
pub use request::{Direction, IoRequest, RequestClass, RequestFlags, RequestId};
pub use sched::{ContiguousMerger, IoScheduler, RequestMerger};
pub use stats::SchedStats;
pub use time::{Duration, Timestamp};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Scheduler name as registered with the block layer
pub const SCHEDULER_NAME: &str = "helix-latency";

// =============================================================================
// TESTS
// =============================================================================
