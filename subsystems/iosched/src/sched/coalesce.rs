//! Tiny-write coalescing.
//!
//! Tiny writes are parked in a bounded staging area for a short delay so
//! that neighbours can be merged before they reach the write FIFO. Staged
//! writes are invisible to direction choice and to the ordered index until
//! flushed.

use super::queues::{Entry, Slot};
use super::{IoScheduler, RequestMerger, WRITE};
use crate::policy::is_aged;
use crate::request::{Direction, IoRequest, RequestClass, RequestMeta};
use crate::time::Timestamp;

/// Staged neighbours close enough to be worth merging
fn adjacent(front: &IoRequest, back: &IoRequest, threshold: u64) -> bool {
    front.end_sector().abs_diff(back.sector) <= threshold
}

impl<M: RequestMerger> IoScheduler<M> {
    /// Tiny, fresh and there is room to stage it
    pub(super) fn should_coalesce(&self, meta: &RequestMeta, now: Timestamp) -> bool {
        meta.class == RequestClass::TinyWrite
            && self.staging.len() < self.tunables.max_coalesced_writes as usize
            && !is_aged(meta, now, self.max_age_ms())
    }

    /// Park a tiny write, arming the flush timer if staging was empty
    pub(super) fn stage_write(
        &mut self,
        rq: IoRequest,
        mut meta: RequestMeta,
        deadline: Timestamp,
        now: Timestamp,
    ) {
        if self.staging.try_push(rq.id).is_err() {
            self.meta.insert(rq.id, meta);
            self.enqueue(rq, deadline);
            return;
        }

        meta.in_coalesce = true;
        self.meta.insert(rq.id, meta);
        self.entries.insert(
            rq.id,
            Entry {
                rq,
                deadline,
                slot: Slot::Staging,
                seq: 0,
                indexed: false,
            },
        );

        if self.staging.len() == 1 {
            let at = now.add_millis(self.tunables.write_coalesce_delay_ms as u64);
            self.coalesce_deadline = Some(at);
            log::debug!("iosched: coalesce armed, flush at {}", at);
        }
    }

    /// Staging flush time, if armed
    pub fn coalesce_deadline(&self) -> Option<Timestamp> {
        self.coalesce_deadline
    }

    /// Merge adjacent staged writes and move the survivors to the write
    /// FIFO in staging order. Hosts may call this to drain staging early.
    pub fn flush_coalesced(&mut self) {
        if self.staging.is_empty() {
            self.coalesce_deadline = None;
            return;
        }

        let threshold = self.tunables.coalesce_sector_threshold as u64;
        let staged = self.staging.len();
        let mut merged = 0;

        // Restart from the front after every merge
        'scan: loop {
            for pos in 0..self.staging.len().saturating_sub(1) {
                let (front_id, back_id) = (self.staging[pos], self.staging[pos + 1]);
                let (Some(front), Some(back)) =
                    (self.entries.get(&front_id), self.entries.get(&back_id))
                else {
                    continue;
                };
                if !adjacent(&front.rq, &back.rq, threshold) {
                    continue;
                }

                let (back_rq, back_deadline) = (back.rq, back.deadline);
                let Some(front) = self.entries.get_mut(&front_id) else {
                    continue;
                };
                if !self.merger.try_merge(&mut front.rq, &back_rq) {
                    continue;
                }
                front.deadline = front.deadline.min(back_deadline);

                self.staging.remove(pos + 1);
                self.entries.remove(&back_id);
                self.meta.remove(&back_id);
                merged += 1;
                continue 'scan;
            }
            break;
        }

        for id in self.staging.drain(..) {
            if let Some(meta) = self.meta.get_mut(&id) {
                meta.in_coalesce = false;
            }
            let Some(entry) = self.entries.get_mut(&id) else {
                log::warn!("iosched: staged {:?} has no entry, dropping", id);
                continue;
            };
            entry.slot = Slot::Fifo(Direction::Write);
            entry.seq = self.fifo[WRITE].push_back(id);
            entry.indexed = true;
            self.index[WRITE].insert(entry.rq.sector, id);
        }

        self.coalesce_deadline = None;
        self.stats.coalesce_flushes += 1;
        self.stats.coalesce_merges += merged as u64;
        log::debug!(
            "iosched: coalesce flush, {} staged -> {} queued",
            staged,
            staged - merged
        );
    }
}
