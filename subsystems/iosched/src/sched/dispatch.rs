//! Dispatch selection.
//!
//! Each call picks at most one request:
//!
//! 1. Critical reads (with `critical-queue`)
//! 2. Expired staging is flushed
//! 3. Write throttle and burst expiry are re-evaluated
//! 4. A running batch continues along the ordered index
//! 5. Otherwise a direction is chosen under the starvation ratio and the
//!    best candidate in that direction is taken

use super::{IoScheduler, RequestMerger, READ, WRITE};
use crate::policy::{is_aged, priority, ScoreSignals, ThrottleChange};
use crate::request::{Direction, IoRequest, RequestClass, RequestId};
use crate::time::Timestamp;

impl<M: RequestMerger> IoScheduler<M> {
    /// Select the next request to hand to the device, if any
    pub fn dispatch(&mut self, now: Timestamp) -> Option<IoRequest> {
        #[cfg(feature = "critical-queue")]
        {
            if let Some(id) = self.critical.front() {
                return self.move_to_dispatch(id, now);
            }
        }

        if self.coalesce_deadline.is_some_and(|at| now.is_at_or_after(at)) {
            self.flush_coalesced();
        }

        self.update_write_throttle();
        self.decay_burst(now);

        if self.batching < self.tunables.fifo_batch as u32 {
            if let Some(id) = self.next_rq[WRITE].or(self.next_rq[READ]) {
                self.batching += 1;
                self.stats.batched += 1;
                return self.move_to_dispatch(id, now);
            }
        }

        let dir = self.choose_direction()?;
        let id = match dir {
            Direction::Read => self.find_best_read(now),
            Direction::Write => self.find_write(now),
        }?;

        self.batching = 1;
        self.move_to_dispatch(id, now)
    }

    /// Reads win until `writes_starved` of them went ahead of a pending write
    fn choose_direction(&mut self) -> Option<Direction> {
        let reads = !self.fifo[READ].is_empty();
        let writes = !self.fifo[WRITE].is_empty();

        if reads {
            if writes && self.starved >= self.writes_starved {
                self.starved = 0;
                self.stats.starved_writes += 1;
                log::debug!("iosched: reads starved writes, serving a write");
                return Some(Direction::Write);
            }
            self.starved += 1;
            return Some(Direction::Read);
        }

        if writes {
            self.starved = 0;
            return Some(Direction::Write);
        }

        None
    }

    /// Bounded scan of the read FIFO by score.
    ///
    /// An aged or critical head is served at once; an aged entry met during
    /// the scan preempts scoring. The head counts towards the scan depth.
    fn find_best_read(&self, now: Timestamp) -> Option<RequestId> {
        let head = self.fifo[READ].front()?;
        let max_age = self.max_age_ms();

        if let Some(meta) = self.meta.get(&head) {
            if meta.class == RequestClass::CriticalRead || is_aged(meta, now, max_age) {
                return Some(head);
            }
        }

        let signals = ScoreSignals {
            burst_active: self.burst.is_active(),
            sequential: self.pattern.is_sequential(),
            turbo_read_boost: self.tunables.turbo_read_boost,
            aging_boost_factor: self.tunables.aging_boost_factor,
            seq_boost_factor: self.tunables.seq_boost_factor,
        };

        let mut best = head;
        let mut best_prio = self.score(head, now, &signals);
        let depth = self.tunables.small_read_scan_depth as usize;

        for id in self.fifo[READ].iter().take(depth).skip(1) {
            let meta = self.meta.get(&id);
            if meta.is_some_and(|m| is_aged(m, now, max_age)) {
                return Some(id);
            }

            let prio = self.score(id, now, &signals);
            if prio > best_prio {
                best = id;
                best_prio = prio;
            }
        }

        Some(best)
    }

    fn score(&self, id: RequestId, now: Timestamp, signals: &ScoreSignals) -> i32 {
        let Some(entry) = self.entries.get(&id) else {
            return i32::MIN;
        };
        let meta = self.meta.get(&id);
        let aged = meta.is_some_and(|m| is_aged(m, now, self.max_age_ms()));
        priority(&self.weights, &entry.rq, meta, aged, signals)
    }

    /// Expired head, else the batch cursor, else the head
    fn find_write(&self, now: Timestamp) -> Option<RequestId> {
        let head = self.fifo[WRITE].front()?;
        let expired = self
            .entries
            .get(&head)
            .is_some_and(|e| now.is_at_or_after(e.deadline));

        match self.next_rq[WRITE] {
            Some(cursor) if !expired => Some(cursor),
            _ => Some(head),
        }
    }

    /// Remove `id` from every structure, advance the batch cursor and
    /// hand the request out
    fn move_to_dispatch(&mut self, id: RequestId, now: Timestamp) -> Option<IoRequest> {
        let Some(entry) = self.entries.remove(&id) else {
            log::warn!("iosched: dispatch of unknown {:?}, dropping it", id);
            self.next_rq = [None, None];
            self.discard_stray(id);
            return None;
        };
        let dir = entry.rq.direction;

        self.next_rq = [None, None];
        if entry.indexed {
            self.next_rq[dir.index()] = self.index[dir.index()].next_after(entry.rq.sector, id);
        }
        self.unlink(id, &entry);

        if let Some(meta) = self.meta.remove(&id) {
            if is_aged(&meta, now, self.max_age_ms()) {
                self.stats.aged += 1;
            }
        }

        match dir {
            Direction::Read => self.stats.dispatched_reads += 1,
            Direction::Write => self.stats.dispatched_writes += 1,
        }
        Some(entry.rq)
    }

    /// Drop a queued id that has no arena entry so it cannot block its head
    fn discard_stray(&mut self, id: RequestId) {
        #[cfg(feature = "critical-queue")]
        {
            self.critical.discard_front(id);
        }
        for fifo in &mut self.fifo {
            fifo.discard_front(id);
        }
    }

    /// Engage or release the write throttle against current write depth
    fn update_write_throttle(&mut self) {
        let threshold = self.tunables.write_throttle_threshold as usize;
        let Some(change) = self.throttle.update(self.write_depth(), threshold) else {
            return;
        };

        // Takes effect now, and survives the end of a running burst
        let base = self.base_writes_starved();
        self.writes_starved = base;
        if let Some(mut saved) = self.burst.saved() {
            saved.writes_starved = base;
            self.burst.update_saved(saved);
        }

        match change {
            ThrottleChange::Engaged => {
                self.stats.throttles += 1;
                log::debug!("iosched: write throttle on, starve ratio {}", base);
            },
            ThrottleChange::Released => {
                log::debug!("iosched: write throttle off, starve ratio {}", base);
            },
        }
    }

    /// Restore the saved policy once a burst has run its course
    fn decay_burst(&mut self, now: Timestamp) {
        if let Some(saved) = self.burst.decay(now, &self.burst_params()) {
            self.writes_starved = saved.writes_starved;
            self.read_expire_ms = saved.read_expire_ms;
        }
    }
}
