//! # Per-Queue Scheduler
//!
//! [`IoScheduler`] owns all scheduling state for one device queue and
//! exposes the host boundary: admission, merge notifications, dispatch,
//! configuration refresh and teardown.
//!
//! The host serialises every call per queue; nothing here locks, sleeps or
//! yields, and every operation is bounded (the read scan by
//! `small_read_scan_depth`, the coalesce flush by the staging capacity).
//!
//! # Submodules
//!
//! - `queues` - arena entries, FIFOs and the sector-ordered index
//! - `merge` - host merge collaborator
//! - `coalesce` - tiny-write staging and flush
//! - `dispatch` - per-tick selection

use arrayvec::ArrayVec;
use hashbrown::HashMap;

use crate::config::{Tunables, MAX_COALESCE_CAPACITY};
use crate::error::{IoSchedError, IoSchedResult};
use crate::policy::{
    classify, BurstController, BurstParams, BurstPhase, ClassThresholds, PatternDetector,
    PatternParams, SavedPolicy, ScoreWeights, WriteThrottle,
};
use crate::request::{Direction, IoRequest, RequestClass, RequestId, RequestMeta};
use crate::stats::SchedStats;
use crate::time::Timestamp;

mod coalesce;
mod dispatch;
mod merge;
mod queues;

#[cfg(test)]
mod tests;

pub use merge::{ContiguousMerger, RequestMerger, DEFAULT_MAX_MERGE_SECTORS};

use queues::{Entry, Fifo, Slot, SortIndex};

const READ: usize = Direction::Read.index();
const WRITE: usize = Direction::Write.index();

// ============================================================================
// SCHEDULER
// ============================================================================

/// Latency-oriented block I/O scheduler for one device queue
#[derive(Debug)]
pub struct IoScheduler<M: RequestMerger = ContiguousMerger> {
    /// Effective configuration snapshot
    tunables: Tunables,
    /// Read scoring weights
    weights: ScoreWeights,
    /// Host merge collaborator
    merger: M,

    /// Queued requests
    entries: HashMap<RequestId, Entry>,
    /// Scheduler metadata, absent for degraded admissions
    meta: HashMap<RequestId, RequestMeta>,
    /// Metadata budget
    meta_limit: Option<usize>,

    /// Sector-ordered index per direction
    index: [SortIndex; 2],
    /// Insertion-ordered queue per direction
    fifo: [Fifo; 2],
    /// Critical reads, served first
    #[cfg(feature = "critical-queue")]
    critical: Fifo,
    /// Tiny writes waiting to be coalesced
    staging: ArrayVec<RequestId, MAX_COALESCE_CAPACITY>,
    /// Staging flush time, armed when the first write is staged
    coalesce_deadline: Option<Timestamp>,

    /// Index successor of the last dispatched request, per direction
    next_rq: [Option<RequestId>; 2],
    /// Requests dispatched in the current batch
    batching: u32,
    /// Reads chosen over pending writes since the last write
    starved: u32,
    /// Effective write-starvation ratio
    writes_starved: u32,
    /// Effective read expiry (ms)
    read_expire_ms: u32,

    throttle: WriteThrottle,
    burst: BurstController,
    pattern: PatternDetector,
    stats: SchedStats,
}

impl IoScheduler<ContiguousMerger> {
    /// Create a scheduler with the stock contiguous merger
    pub fn new(tunables: Tunables) -> IoSchedResult<Self> {
        Self::with_merger(tunables, ContiguousMerger::default())
    }
}

impl Default for IoScheduler<ContiguousMerger> {
    fn default() -> Self {
        Self::build(Tunables::DEFAULT, ContiguousMerger::default())
    }
}

impl<M: RequestMerger> IoScheduler<M> {
    /// Create a scheduler with a host merge collaborator
    pub fn with_merger(tunables: Tunables, merger: M) -> IoSchedResult<Self> {
        tunables.validate()?;
        Ok(Self::build(tunables, merger))
    }

    fn build(tunables: Tunables, merger: M) -> Self {
        log::info!(
            "iosched: {} scheduler created (batch {}, starve ratio {})",
            crate::SCHEDULER_NAME,
            tunables.fifo_batch,
            tunables.writes_starved_ratio
        );

        Self {
            tunables,
            weights: ScoreWeights::DEFAULT,
            merger,
            entries: HashMap::new(),
            meta: HashMap::new(),
            meta_limit: None,
            index: [SortIndex::new(), SortIndex::new()],
            fifo: [Fifo::new(), Fifo::new()],
            #[cfg(feature = "critical-queue")]
            critical: Fifo::new(),
            staging: ArrayVec::new(),
            coalesce_deadline: None,
            next_rq: [None, None],
            batching: 0,
            starved: 0,
            writes_starved: tunables.writes_starved_ratio as u32,
            read_expire_ms: tunables.read_expire_ms as u32,
            throttle: WriteThrottle::new(),
            burst: BurstController::new(),
            pattern: PatternDetector::new(),
            stats: SchedStats::default(),
        }
    }

    /// Replace the read scoring weights
    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Cap the number of requests carrying metadata; admissions beyond the
    /// cap are degraded rather than refused
    pub fn with_metadata_limit(mut self, limit: usize) -> Self {
        self.meta_limit = Some(limit);
        self
    }

    // ========================================================================
    // ADMISSION
    // ========================================================================

    /// Accept a new request
    pub fn admit(&mut self, rq: IoRequest, now: Timestamp) {
        if self.entries.contains_key(&rq.id) {
            log::warn!("iosched: {:?} admitted twice, ignoring", rq.id);
            return;
        }

        self.stats.admitted += 1;
        let dir = rq.direction;

        if !self.reserve_meta() {
            self.admit_degraded(rq, now);
            return;
        }

        let thresholds = ClassThresholds::from_tunables(&self.tunables);
        let class = classify(dir, rq.bytes(), &thresholds);
        let meta = RequestMeta::new(now, class);
        log::trace!("iosched: {:?} admitted as {}", rq.id, class.name());

        let expire_ms = if class == RequestClass::CriticalRead {
            self.tunables.critical_read_expire_ms as u64
        } else {
            self.fifo_expire_ms(dir)
        };
        let deadline = now.add_millis(expire_ms);

        #[cfg(feature = "critical-queue")]
        {
            if class == RequestClass::CriticalRead {
                self.meta.insert(rq.id, meta);
                let seq = self.critical.push_back(rq.id);
                self.entries.insert(
                    rq.id,
                    Entry {
                        rq,
                        deadline,
                        slot: Slot::Critical,
                        seq,
                        indexed: true,
                    },
                );
                self.index[READ].insert(rq.sector, rq.id);
                self.observe_read(&rq, now);
                return;
            }
        }

        if dir == Direction::Write && self.should_coalesce(&meta, now) {
            self.stage_write(rq, meta, deadline, now);
            return;
        }

        self.meta.insert(rq.id, meta);
        self.enqueue(rq, deadline);
        self.observe_read(&rq, now);
    }

    /// Room for one more metadata record
    fn reserve_meta(&mut self) -> bool {
        if let Some(limit) = self.meta_limit {
            if self.meta.len() >= limit {
                return false;
            }
        }
        self.meta.try_reserve(1).is_ok()
    }

    /// Queue without metadata: FIFO only, no index, no classification
    fn admit_degraded(&mut self, rq: IoRequest, now: Timestamp) {
        let dir = rq.direction;
        log::warn!(
            "iosched: no metadata for {} {:?}, queueing unclassified",
            dir.name(),
            rq.id
        );

        let seq = self.fifo[dir.index()].push_back(rq.id);
        self.entries.insert(
            rq.id,
            Entry {
                rq,
                deadline: now.add_millis(self.fifo_expire_ms(dir)),
                slot: Slot::Fifo(dir),
                seq,
                indexed: false,
            },
        );
        self.stats.degraded += 1;
    }

    /// Insert into the direction FIFO and ordered index
    fn enqueue(&mut self, rq: IoRequest, deadline: Timestamp) {
        let dir = rq.direction.index();
        let seq = self.fifo[dir].push_back(rq.id);
        self.entries.insert(
            rq.id,
            Entry {
                rq,
                deadline,
                slot: Slot::Fifo(rq.direction),
                seq,
                indexed: true,
            },
        );
        self.index[dir].insert(rq.sector, rq.id);
    }

    /// Feed pattern and burst state with an admitted read
    fn observe_read(&mut self, rq: &IoRequest, now: Timestamp) {
        if !rq.is_read() {
            return;
        }

        self.pattern.update(rq, &self.pattern_params());

        let current = SavedPolicy {
            writes_starved: self.writes_starved,
            read_expire_ms: self.read_expire_ms,
        };
        if self.burst.on_read(now, &self.burst_params(), current) {
            self.writes_starved = self.tunables.writes_starved_burst as u32;
            self.read_expire_ms = self.tunables.critical_read_expire_ms as u32;
            self.stats.bursts += 1;
        }
    }

    // ========================================================================
    // MERGE NOTIFICATIONS
    // ========================================================================

    /// A request grew at its front; `rq` carries its new geometry
    pub fn notify_front_merge(&mut self, rq: &IoRequest) {
        let Some(entry) = self.entries.get_mut(&rq.id) else {
            log::warn!("iosched: front merge for unknown {:?}", rq.id);
            return;
        };

        if entry.indexed {
            let index = &mut self.index[entry.rq.direction.index()];
            index.remove(entry.rq.sector, rq.id);
            index.insert(rq.sector, rq.id);
        }
        entry.rq.sector = rq.sector;
        entry.rq.nr_sectors = rq.nr_sectors;
        entry.rq.flags = rq.flags;

        self.stats.front_merges += 1;
    }

    /// `absorbed` was merged into `survivor` and no longer exists
    pub fn notify_merge(&mut self, survivor: &IoRequest, absorbed: RequestId) {
        if survivor.id == absorbed {
            log::warn!("iosched: {:?} merged into itself", absorbed);
            return;
        }
        let Some(gone) = self.entries.remove(&absorbed) else {
            log::warn!("iosched: merge of unknown {:?}", absorbed);
            return;
        };

        if let Some(entry) = self.entries.get_mut(&survivor.id) {
            if entry.indexed && entry.rq.sector != survivor.sector {
                let index = &mut self.index[entry.rq.direction.index()];
                index.remove(entry.rq.sector, survivor.id);
                index.insert(survivor.sector, survivor.id);
            }
            entry.rq.sector = survivor.sector;
            entry.rq.nr_sectors = survivor.nr_sectors;
            entry.rq.flags = survivor.flags;

            // Survivor inherits the earlier deadline and its FIFO place
            if let (Slot::Fifo(a), Slot::Fifo(b)) = (entry.slot, gone.slot) {
                if a == b
                    && gone.deadline < entry.deadline
                    && self.fifo[a.index()].take_place(entry.seq, gone.seq, survivor.id)
                {
                    entry.seq = gone.seq;
                    entry.deadline = gone.deadline;
                }
            }
        }

        self.unlink(absorbed, &gone);
        let dir = gone.rq.direction.index();
        if self.next_rq[dir] == Some(absorbed) {
            self.next_rq[dir] = None;
        }
        self.meta.remove(&absorbed);
        self.stats.merges += 1;
    }

    /// Drop `id` from its queue and the ordered index
    fn unlink(&mut self, id: RequestId, entry: &Entry) {
        match entry.slot {
            Slot::Fifo(dir) => {
                self.fifo[dir.index()].remove(entry.seq, id);
            },
            Slot::Staging => {
                self.staging.retain(|staged| *staged != id);
            },
            #[cfg(feature = "critical-queue")]
            Slot::Critical => {
                self.critical.remove(entry.seq, id);
            },
        }
        if entry.indexed {
            self.index[entry.rq.direction.index()].remove(entry.rq.sector, id);
        }
    }

    /// Queued request sorting just before `id`
    pub fn former_request(&self, id: RequestId) -> Option<RequestId> {
        let entry = self.entries.get(&id).filter(|e| e.indexed)?;
        self.index[entry.rq.direction.index()].prev_before(entry.rq.sector, id)
    }

    /// Queued request sorting just after `id`
    pub fn latter_request(&self, id: RequestId) -> Option<RequestId> {
        let entry = self.entries.get(&id).filter(|e| e.indexed)?;
        self.index[entry.rq.direction.index()].next_after(entry.rq.sector, id)
    }

    // ========================================================================
    // CONFIGURATION & LIFECYCLE
    // ========================================================================

    /// Replace the effective configuration with a validated snapshot.
    ///
    /// Must be called between scheduling operations. A running burst keeps
    /// its overrides (taken from the new snapshot) and will restore the new
    /// base values when it ends.
    pub fn apply_configuration(&mut self, snapshot: &Tunables) -> IoSchedResult<()> {
        snapshot.validate()?;
        self.tunables = *snapshot;

        let base = SavedPolicy {
            writes_starved: self.base_writes_starved(),
            read_expire_ms: self.tunables.read_expire_ms as u32,
        };
        if self.burst.is_active() {
            self.burst.update_saved(base);
            self.writes_starved = self.tunables.writes_starved_burst as u32;
            self.read_expire_ms = self.tunables.critical_read_expire_ms as u32;
        } else {
            self.writes_starved = base.writes_starved;
            self.read_expire_ms = base.read_expire_ms;
        }

        log::info!(
            "iosched: configuration applied (starve ratio {}, read expire {}ms)",
            self.writes_starved,
            self.read_expire_ms
        );
        Ok(())
    }

    /// Verify the scheduler is empty and release its state
    pub fn teardown(&mut self) -> IoSchedResult<()> {
        #[allow(unused_mut)]
        let mut reads = self.fifo[READ].len();
        #[cfg(feature = "critical-queue")]
        {
            reads += self.critical.len();
        }
        let writes = self.fifo[WRITE].len();
        let staged = self.staging.len();
        let indexed = self.index[READ].len() + self.index[WRITE].len();

        if reads + writes + staged + indexed > 0 {
            log::error!(
                "iosched: teardown with {} reads, {} writes, {} staged, {} indexed",
                reads,
                writes,
                staged,
                indexed
            );
            return Err(IoSchedError::QueueNotEmpty {
                reads,
                writes,
                staged,
                indexed,
            });
        }

        self.entries.clear();
        self.meta.clear();
        self.next_rq = [None, None];
        self.coalesce_deadline = None;
        log::debug!("iosched: queue scheduler torn down");
        Ok(())
    }

    // ========================================================================
    // DERIVED PARAMETERS
    // ========================================================================

    fn fifo_expire_ms(&self, dir: Direction) -> u64 {
        match dir {
            Direction::Read => self.read_expire_ms as u64,
            Direction::Write => self.tunables.write_expire_ms as u64,
        }
    }

    /// Starvation ratio outside bursts, doubled while throttling
    fn base_writes_starved(&self) -> u32 {
        let ratio = self.tunables.writes_starved_ratio as u32;
        if self.throttle.is_active() {
            ratio * 2
        } else {
            ratio
        }
    }

    fn burst_params(&self) -> BurstParams {
        BurstParams {
            window_ms: self.tunables.burst_window_ms as u64,
            threshold: self.tunables.burst_threshold as u32,
            decay_ms: self.tunables.burst_decay_ms as u64,
            hysteresis_ms: self.tunables.burst_hysteresis_ms as u64,
        }
    }

    fn pattern_params(&self) -> PatternParams {
        PatternParams {
            seq_threshold_sectors: self.tunables.seq_threshold_sectors as u64,
            large_read_kb: self.tunables.large_read_kb as u32,
        }
    }

    fn max_age_ms(&self) -> u64 {
        self.tunables.max_request_age_ms as u64
    }

    // ========================================================================
    // INTROSPECTION
    // ========================================================================

    /// Effective configuration
    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    /// Counters
    pub fn stats(&self) -> &SchedStats {
        &self.stats
    }

    /// Burst controller state
    pub fn burst_state(&self) -> BurstPhase {
        self.burst.state().phase()
    }

    /// Read stream judged sequential
    pub fn is_sequential(&self) -> bool {
        self.pattern.is_sequential()
    }

    /// Sequential locality score
    pub fn seq_score(&self) -> u32 {
        self.pattern.seq_score()
    }

    /// Write throttle engaged
    pub fn write_throttle_active(&self) -> bool {
        self.throttle.is_active()
    }

    /// Reads allowed ahead of a pending write right now
    pub fn effective_writes_starved(&self) -> u32 {
        self.writes_starved
    }

    /// Read expiry applied to new reads right now (ms)
    pub fn effective_read_expire_ms(&self) -> u32 {
        self.read_expire_ms
    }

    /// Requests in a direction FIFO
    pub fn queued(&self, dir: Direction) -> usize {
        self.fifo[dir.index()].len()
    }

    /// Writes in the staging area
    pub fn staged(&self) -> usize {
        self.staging.len()
    }

    /// Writes queued or staged
    pub fn write_depth(&self) -> usize {
        self.fifo[WRITE].len() + self.staging.len()
    }

    /// Request currently owned by the scheduler
    pub fn contains(&self, id: RequestId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Class assigned at admission, `None` for degraded or unknown requests
    pub fn class_of(&self, id: RequestId) -> Option<RequestClass> {
        self.meta.get(&id).map(|m| m.class)
    }

    /// Current descriptor of a queued request
    pub fn request(&self, id: RequestId) -> Option<&IoRequest> {
        self.entries.get(&id).map(|e| &e.rq)
    }

    /// FIFO expiry of a queued request
    pub fn deadline(&self, id: RequestId) -> Option<Timestamp> {
        self.entries.get(&id).map(|e| e.deadline)
    }

    /// Nothing queued, staged or indexed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
