//! Scheduler scenario tests.

use alloc::vec::Vec;

use super::*;
use crate::config::TunableRegistry;
use crate::error::ConfigError;

fn ms(v: u64) -> Timestamp {
    Timestamp::from_millis(v)
}

fn id(v: u64) -> RequestId {
    RequestId(v)
}

fn tunables(edits: &[(&str, i64)]) -> Tunables {
    let mut t = Tunables::DEFAULT;
    for &(name, value) in edits {
        t.set(name, value).unwrap();
    }
    t
}

fn drain<M: RequestMerger>(sched: &mut IoScheduler<M>, now: Timestamp) -> Vec<u64> {
    let mut out = Vec::new();
    while let Some(rq) = sched.dispatch(now) {
        out.push(rq.id.as_u64());
    }
    out
}

/// Merges any neighbour it is offered
struct AlwaysMerge;

impl RequestMerger for AlwaysMerge {
    fn try_merge(&mut self, front: &mut IoRequest, back: &IoRequest) -> bool {
        front.nr_sectors += back.nr_sectors;
        true
    }
}

// =============================================================================
// BURST
// =============================================================================

#[test]
fn test_burst_activates_on_threshold_read() {
    let mut sched: IoScheduler = IoScheduler::default();
    for i in 0..7u64 {
        sched.admit(IoRequest::read(i + 1, i * 10_000, 16), ms(i));
    }
    assert_eq!(sched.burst_state(), BurstPhase::Idle);
    assert_eq!(sched.effective_writes_starved(), 3);

    sched.admit(IoRequest::read(8, 70_000, 16), ms(7));
    assert_eq!(sched.burst_state(), BurstPhase::Active);
    assert_eq!(sched.effective_writes_starved(), 6);
    assert_eq!(sched.effective_read_expire_ms(), 30);

    sched.admit(IoRequest::read(9, 80_000, 16), ms(8));
    sched.admit(IoRequest::read(10, 90_000, 16), ms(9));
    assert_eq!(sched.burst_state(), BurstPhase::Active);
    assert_eq!(sched.stats().bursts, 1);
}

#[test]
fn test_burst_decays_then_cools_down() {
    let mut sched: IoScheduler = IoScheduler::default();
    for i in 0..8u64 {
        sched.admit(IoRequest::read(i + 1, i * 10_000, 32), ms(i));
    }
    assert_eq!(sched.burst_state(), BurstPhase::Active);

    sched.dispatch(ms(156));
    assert_eq!(sched.burst_state(), BurstPhase::Active);

    sched.dispatch(ms(157));
    assert_eq!(sched.burst_state(), BurstPhase::Cooldown);
    assert_eq!(sched.effective_writes_starved(), 3);
    assert_eq!(sched.effective_read_expire_ms(), 200);

    // Threshold reached again inside the cooldown
    for i in 0..8u64 {
        sched.admit(IoRequest::read(20 + i, 100_000 + i * 10_000, 32), ms(160 + i));
    }
    assert_eq!(sched.burst_state(), BurstPhase::Cooldown);
    assert_eq!(sched.stats().bursts, 1);

    sched.admit(IoRequest::read(40, 500_000, 32), ms(207));
    assert_eq!(sched.burst_state(), BurstPhase::Active);
    assert_eq!(sched.stats().bursts, 2);
}

#[test]
fn test_burst_deadline_uses_shortened_read_expiry() {
    let mut sched: IoScheduler = IoScheduler::default();
    for i in 0..8u64 {
        sched.admit(IoRequest::read(i + 1, i * 10_000, 32), ms(0));
    }
    sched.admit(IoRequest::read(9, 90_000, 32), ms(10));
    assert_eq!(sched.deadline(id(1)), Some(ms(200)));
    assert_eq!(sched.deadline(id(9)), Some(ms(40)));
}

// =============================================================================
// COALESCING
// =============================================================================

#[test]
fn test_contiguous_tiny_writes_flush_as_one() {
    let mut sched: IoScheduler = IoScheduler::default();
    for i in 0..5u64 {
        sched.admit(IoRequest::write(i + 1, i * 8, 8), ms(0));
    }
    assert_eq!(sched.staged(), 5);
    assert_eq!(sched.queued(Direction::Write), 0);
    assert_eq!(sched.write_depth(), 5);
    assert_eq!(sched.coalesce_deadline(), Some(ms(5)));

    assert!(sched.dispatch(ms(4)).is_none());

    let rq = sched.dispatch(ms(5)).unwrap();
    assert_eq!(rq.id, id(1));
    assert_eq!(rq.sector, 0);
    assert_eq!(rq.nr_sectors, 40);
    assert_eq!(sched.stats().coalesce_merges, 4);
    assert_eq!(sched.stats().coalesce_flushes, 1);
    assert_eq!(sched.coalesce_deadline(), None);

    assert!(sched.is_empty());
    assert!(sched.teardown().is_ok());
}

#[test]
fn test_coalesce_conserves_requests() {
    let mut sched = IoScheduler::with_merger(Tunables::DEFAULT, AlwaysMerge).unwrap();
    for (i, sector) in [0u64, 100, 5_000, 5_100, 20_000].into_iter().enumerate() {
        sched.admit(IoRequest::write(i as u64 + 1, sector, 8), ms(0));
    }
    assert_eq!(sched.staged(), 5);

    let order = drain(&mut sched, ms(5));
    assert_eq!(order, [1, 3, 5]);

    let stats = sched.stats();
    assert_eq!(stats.admitted, stats.dispatched() + stats.coalesce_merges);
    assert_eq!(stats.coalesce_merges, 2);
}

#[test]
fn test_full_staging_bypasses_coalescing() {
    let mut sched: IoScheduler = IoScheduler::default();
    for i in 0..9u64 {
        sched.admit(IoRequest::write(i + 1, i * 10_000, 8), ms(0));
    }
    assert_eq!(sched.staged(), 8);
    assert_eq!(sched.queued(Direction::Write), 1);

    let rq = sched.dispatch(ms(0)).unwrap();
    assert_eq!(rq.id, id(9));
}

#[test]
fn test_staged_writes_are_not_indexed() {
    let mut sched: IoScheduler = IoScheduler::default();
    sched.admit(IoRequest::write(1, 0, 8), ms(0));
    sched.admit(IoRequest::write(2, 50_000, 8), ms(0));
    assert_eq!(sched.latter_request(id(1)), None);

    sched.flush_coalesced();
    assert_eq!(sched.staged(), 0);
    assert_eq!(sched.latter_request(id(1)), Some(id(2)));
    assert_eq!(sched.former_request(id(2)), Some(id(1)));
}

// =============================================================================
// READ SELECTION
// =============================================================================

#[test]
fn test_aged_head_beats_large_reads() {
    let t = tunables(&[("seq_threshold_sectors", 1024)]);
    let mut sched = IoScheduler::new(t).unwrap();

    sched.admit(IoRequest::read(1, 1_000_000, 32), ms(0));
    for i in 0..30u64 {
        sched.admit(IoRequest::read(100 + i, i * 512, 512), ms(0));
    }
    assert!(sched.is_sequential());

    let rq = sched.dispatch(ms(1001)).unwrap();
    assert_eq!(rq.id, id(1));
    assert_eq!(sched.stats().aged, 1);
}

#[test]
fn test_scan_prefers_higher_score() {
    let mut sched: IoScheduler = IoScheduler::default();
    sched.admit(IoRequest::read(1, 0, 32), ms(0));
    sched.admit(IoRequest::read(2, 10_000, 512), ms(0));

    assert_eq!(drain(&mut sched, ms(1)), [2, 1]);
}

#[test]
fn test_aged_entry_preempts_scan() {
    let weights = ScoreWeights {
        aging_scale: 0,
        ..ScoreWeights::DEFAULT
    };
    let mut sched: IoScheduler = IoScheduler::default().with_weights(weights);
    sched.admit(IoRequest::read(1, 1_000, 32), ms(0));
    sched.admit(IoRequest::read(2, 50_000, 32), ms(0));
    sched.admit(IoRequest::read(3, 1_032, 32), ms(600));
    sched.admit(IoRequest::read(4, 90_000, 512), ms(600));

    // 3 absorbs 1 and takes the head with a fresh enqueue time
    sched.notify_merge(&IoRequest::read(3, 1_000, 64), id(1));

    // 2 is aged mid-scan; 4 scores higher but must not be chosen
    let rq = sched.dispatch(ms(1001)).unwrap();
    assert_eq!(rq.id, id(2));
    assert_eq!(sched.stats().aged, 1);
}

#[test]
fn test_critical_head_served_without_scan() {
    let mut sched: IoScheduler = IoScheduler::default();
    sched.admit(IoRequest::read(1, 0, 8), ms(0));
    sched.admit(IoRequest::read(2, 10_000, 512), ms(0));

    assert_eq!(sched.class_of(id(1)), Some(RequestClass::CriticalRead));
    assert_eq!(sched.dispatch(ms(1)).map(|rq| rq.id), Some(id(1)));
}

#[test]
fn test_scan_depth_counts_head() {
    let t = tunables(&[("small_read_scan_depth", 4), ("burst_threshold", 50)]);
    let mut sched = IoScheduler::new(t).unwrap();
    for i in 0..4u64 {
        sched.admit(IoRequest::read(i + 1, i * 10_000, 32), ms(0));
    }
    // Fifth entry outscores everything but sits past the scan window
    sched.admit(IoRequest::read(5, 90_000, 512), ms(0));

    assert_eq!(sched.dispatch(ms(1)).map(|rq| rq.id), Some(id(1)));
}

// =============================================================================
// DIRECTION & BATCHING
// =============================================================================

#[test]
fn test_writes_not_starved_past_ratio() {
    for ratio in [1i64, 3, 5] {
        let t = tunables(&[
            ("fifo_batch", 1),
            ("burst_threshold", 50),
            ("writes_starved_ratio", ratio),
        ]);
        let mut sched = IoScheduler::new(t).unwrap();
        for i in 0..10u64 {
            sched.admit(IoRequest::read(i + 1, i * 10_000, 32), ms(0));
        }
        sched.admit(IoRequest::write(100, 500_000, 128), ms(0));

        let order = drain(&mut sched, ms(1));
        assert_eq!(order.len(), 11);
        assert_eq!(order.iter().position(|&v| v == 100), Some(ratio as usize));
        assert_eq!(sched.stats().starved_writes, 1);
    }
}

#[test]
fn test_batch_follows_sector_order() {
    let mut sched: IoScheduler = IoScheduler::default();
    sched.admit(IoRequest::read(1, 100, 32), ms(0));
    sched.admit(IoRequest::read(2, 300, 32), ms(0));
    sched.admit(IoRequest::read(3, 200, 32), ms(0));

    assert_eq!(drain(&mut sched, ms(1)), [1, 3, 2]);
    assert_eq!(sched.stats().batched, 2);
}

#[test]
fn test_write_cursor_unless_head_expired() {
    let t = tunables(&[("fifo_batch", 1)]);
    let setup = || {
        let mut sched = IoScheduler::new(t).unwrap();
        for (i, sector) in [100u64, 5_000, 200, 300].into_iter().enumerate() {
            sched.admit(IoRequest::write(i as u64 + 1, sector, 128), ms(0));
        }
        assert_eq!(sched.dispatch(ms(1)).map(|rq| rq.id), Some(id(1)));
        sched
    };

    let mut fresh = setup();
    assert_eq!(fresh.dispatch(ms(1)).map(|rq| rq.id), Some(id(3)));

    let mut expired = setup();
    assert_eq!(expired.dispatch(ms(4000)).map(|rq| rq.id), Some(id(2)));
}

// =============================================================================
// WRITE THROTTLE
// =============================================================================

#[test]
fn test_write_throttle_hysteresis() {
    let t = tunables(&[("write_throttle_threshold", 8)]);
    let mut sched = IoScheduler::new(t).unwrap();
    for i in 0..9u64 {
        sched.admit(IoRequest::write(i + 1, i * 10_000, 128), ms(0));
    }
    assert!(!sched.write_throttle_active());

    sched.dispatch(ms(1)).unwrap();
    assert!(sched.write_throttle_active());
    assert_eq!(sched.effective_writes_starved(), 6);
    assert_eq!(sched.stats().throttles, 1);

    for _ in 0..4 {
        sched.dispatch(ms(1)).unwrap();
    }
    assert!(sched.write_throttle_active());

    sched.dispatch(ms(1)).unwrap();
    assert!(!sched.write_throttle_active());
    assert_eq!(sched.effective_writes_starved(), 3);
}

#[test]
fn test_throttle_overrides_burst_ratio() {
    let t = tunables(&[("write_throttle_threshold", 8), ("writes_starved_burst", 10)]);
    let mut sched = IoScheduler::new(t).unwrap();
    for i in 0..9u64 {
        sched.admit(IoRequest::write(i + 1, i * 10_000, 128), ms(0));
    }
    for i in 0..8u64 {
        sched.admit(IoRequest::read(100 + i, 1_000_000 + i * 10_000, 32), ms(i));
    }
    assert_eq!(sched.burst_state(), BurstPhase::Active);

    sched.dispatch(ms(8)).unwrap();
    assert!(sched.write_throttle_active());
    assert_eq!(sched.burst_state(), BurstPhase::Active);
    assert_eq!(sched.effective_writes_starved(), 6);

    sched.dispatch(ms(157)).unwrap();
    assert_eq!(sched.burst_state(), BurstPhase::Cooldown);
    assert!(sched.write_throttle_active());
    assert_eq!(sched.effective_writes_starved(), 6);
}

#[test]
fn test_deep_write_queue_drains_in_order() {
    let t = tunables(&[("fifo_batch", 1)]);
    let mut sched = IoScheduler::new(t).unwrap();
    for i in 0..2_000u64 {
        sched.admit(IoRequest::write(i + 1, i * 1_000, 128), ms(0));
    }
    for i in (0..2_000u64).step_by(10) {
        sched.notify_merge(&IoRequest::write(i + 1, i * 1_000, 256), id(i + 2));
    }
    assert_eq!(sched.queued(Direction::Write), 1_800);

    let expected: Vec<u64> = (1..=2_000u64).filter(|v| v % 10 != 2).collect();
    assert_eq!(drain(&mut sched, ms(1)), expected);
    assert!(sched.teardown().is_ok());
}

// =============================================================================
// QUEUE CONSISTENCY
// =============================================================================

#[test]
fn test_queued_id_without_entry_is_dropped() {
    let mut sched: IoScheduler = IoScheduler::default();
    sched.fifo[WRITE].push_back(id(99));
    sched.admit(IoRequest::write(1, 0, 128), ms(0));

    assert!(sched.dispatch(ms(1)).is_none());
    assert_eq!(sched.queued(Direction::Write), 1);
    assert_eq!(sched.dispatch(ms(1)).map(|rq| rq.id), Some(id(1)));
    assert!(sched.teardown().is_ok());
}

#[test]
fn test_flush_skips_staged_id_without_entry() {
    let mut sched: IoScheduler = IoScheduler::default();
    sched.admit(IoRequest::write(1, 0, 8), ms(0));
    sched.staging.push(id(99));
    assert_eq!(sched.staged(), 2);

    sched.flush_coalesced();
    assert_eq!(sched.staged(), 0);
    assert_eq!(sched.queued(Direction::Write), 1);
    assert_eq!(drain(&mut sched, ms(1)), [1]);
    assert!(sched.teardown().is_ok());
}

// =============================================================================
// DEGRADED ADMISSION
// =============================================================================

#[test]
fn test_degraded_admission() {
    let mut sched: IoScheduler = IoScheduler::default().with_metadata_limit(1);
    sched.admit(IoRequest::read(1, 100, 32), ms(0));
    sched.admit(IoRequest::read(2, 200, 32), ms(0));

    assert_eq!(sched.class_of(id(1)), Some(RequestClass::SmallRead));
    assert_eq!(sched.class_of(id(2)), None);
    assert_eq!(sched.stats().degraded, 1);
    assert_eq!(sched.queued(Direction::Read), 2);
    assert_eq!(sched.latter_request(id(1)), None);
    assert_eq!(sched.deadline(id(2)), Some(ms(200)));

    // Unclassified base score outranks a small read
    assert_eq!(drain(&mut sched, ms(1)), [2, 1]);
    assert!(sched.teardown().is_ok());
}

#[test]
fn test_degraded_requests_skip_policy_state() {
    let mut sched: IoScheduler = IoScheduler::default().with_metadata_limit(0);
    for i in 0..8u64 {
        sched.admit(IoRequest::read(i + 1, i * 10_000, 32), ms(i));
    }
    sched.admit(IoRequest::write(20, 0, 8), ms(8));

    assert_eq!(sched.burst_state(), BurstPhase::Idle);
    assert_eq!(sched.staged(), 0);
    assert_eq!(sched.queued(Direction::Write), 1);
    assert_eq!(sched.stats().degraded, 9);
}

// =============================================================================
// MERGE NOTIFICATIONS
// =============================================================================

#[test]
fn test_merge_transfers_earlier_deadline() {
    let mut sched: IoScheduler = IoScheduler::default();
    sched.admit(IoRequest::write(1, 1000, 128), ms(0));
    sched.admit(IoRequest::write(3, 50_000, 128), ms(5));
    sched.admit(IoRequest::write(2, 1128, 128), ms(10));

    sched.notify_merge(&IoRequest::write(2, 1000, 256), id(1));

    assert!(!sched.contains(id(1)));
    assert_eq!(sched.deadline(id(2)), Some(ms(4000)));
    assert_eq!(sched.request(id(2)).map(|rq| rq.sector), Some(1000));
    assert_eq!(sched.queued(Direction::Write), 2);
    assert_eq!(sched.stats().merges, 1);

    assert_eq!(drain(&mut sched, ms(20)), [2, 3]);
}

#[test]
fn test_merge_clears_cursor_on_absorbed() {
    let mut sched: IoScheduler = IoScheduler::default();
    sched.admit(IoRequest::read(1, 100, 32), ms(0));
    sched.admit(IoRequest::read(2, 200, 32), ms(0));
    sched.admit(IoRequest::read(3, 300, 32), ms(0));

    assert_eq!(sched.dispatch(ms(1)).map(|rq| rq.id), Some(id(1)));

    sched.notify_merge(&IoRequest::read(3, 200, 64), id(2));
    assert_eq!(drain(&mut sched, ms(1)), [3]);
    assert!(sched.is_empty());
}

#[test]
fn test_front_merge_reindexes() {
    let mut sched: IoScheduler = IoScheduler::default();
    sched.admit(IoRequest::read(1, 100, 32), ms(0));
    sched.admit(IoRequest::read(2, 200, 32), ms(0));
    sched.admit(IoRequest::read(3, 300, 32), ms(0));
    assert_eq!(sched.former_request(id(2)), Some(id(1)));
    assert_eq!(sched.latter_request(id(2)), Some(id(3)));

    sched.notify_front_merge(&IoRequest::read(3, 50, 282));

    assert_eq!(sched.request(id(3)).map(|rq| rq.sector), Some(50));
    assert_eq!(sched.latter_request(id(2)), None);
    assert_eq!(sched.former_request(id(1)), Some(id(3)));
    assert_eq!(sched.stats().front_merges, 1);
}

#[test]
fn test_unknown_notifications_ignored() {
    let mut sched: IoScheduler = IoScheduler::default();
    sched.admit(IoRequest::read(1, 100, 32), ms(0));

    sched.notify_front_merge(&IoRequest::read(9, 0, 8));
    sched.notify_merge(&IoRequest::read(1, 100, 64), id(9));

    assert_eq!(sched.stats().merges, 0);
    assert_eq!(sched.stats().front_merges, 0);
    assert_eq!(sched.queued(Direction::Read), 1);
}

// =============================================================================
// CONFIGURATION & LIFECYCLE
// =============================================================================

#[test]
fn test_invalid_snapshot_rejected() {
    let mut bad = Tunables::DEFAULT;
    bad.fifo_batch = 0;
    assert!(IoScheduler::new(bad).is_err());

    let mut sched: IoScheduler = IoScheduler::default();
    let err = sched.apply_configuration(&bad).unwrap_err();
    assert!(matches!(
        err,
        IoSchedError::Config(ConfigError::OutOfRange {
            name: "fifo_batch",
            ..
        })
    ));
    assert_eq!(sched.tunables(), &Tunables::DEFAULT);
}

#[test]
fn test_apply_configuration_during_burst() {
    let mut sched: IoScheduler = IoScheduler::default();
    for i in 0..8u64 {
        sched.admit(IoRequest::read(i + 1, i * 10_000, 32), ms(i));
    }
    assert_eq!(sched.burst_state(), BurstPhase::Active);

    let t = tunables(&[("writes_starved_ratio", 5), ("read_expire_ms", 300)]);
    sched.apply_configuration(&t).unwrap();
    assert_eq!(sched.effective_writes_starved(), 6);
    assert_eq!(sched.effective_read_expire_ms(), 30);

    sched.dispatch(ms(157));
    assert_eq!(sched.burst_state(), BurstPhase::Cooldown);
    assert_eq!(sched.effective_writes_starved(), 5);
    assert_eq!(sched.effective_read_expire_ms(), 300);
}

#[test]
fn test_registry_snapshot_applies() {
    let registry = TunableRegistry::new();
    registry.store("fifo_batch", "1").unwrap();
    registry.store("read_expire_ms", "500").unwrap();

    let mut sched: IoScheduler = IoScheduler::default();
    sched.apply_configuration(&registry.snapshot()).unwrap();
    assert_eq!(sched.tunables().fifo_batch, 1);
    assert_eq!(sched.effective_read_expire_ms(), 500);

    sched.admit(IoRequest::read(1, 0, 32), ms(0));
    assert_eq!(sched.deadline(id(1)), Some(ms(500)));
}

#[test]
fn test_teardown_requires_empty() {
    let mut sched: IoScheduler = IoScheduler::default();
    sched.admit(IoRequest::write(1, 0, 8), ms(0));
    sched.admit(IoRequest::read(2, 100, 32), ms(0));

    let err = sched.teardown().unwrap_err();
    assert_eq!(
        err,
        IoSchedError::QueueNotEmpty {
            reads: 1,
            writes: 0,
            staged: 1,
            indexed: 1,
        }
    );
    assert!(sched.contains(id(1)));

    assert_eq!(drain(&mut sched, ms(10)), [2, 1]);
    assert!(sched.teardown().is_ok());
    assert!(sched.is_empty());
}

#[test]
fn test_duplicate_admission_ignored() {
    let mut sched: IoScheduler = IoScheduler::default();
    sched.admit(IoRequest::read(1, 100, 32), ms(0));
    sched.admit(IoRequest::read(1, 900, 32), ms(1));

    assert_eq!(sched.stats().admitted, 1);
    assert_eq!(sched.request(id(1)).map(|rq| rq.sector), Some(100));
}

#[cfg(feature = "critical-queue")]
#[test]
fn test_critical_queue_drains_first() {
    let t = tunables(&[("writes_starved_ratio", 1)]);
    let mut sched = IoScheduler::new(t).unwrap();
    sched.admit(IoRequest::write(1, 0, 128), ms(0));
    sched.admit(IoRequest::read(2, 1000, 32), ms(0));
    sched.admit(IoRequest::read(3, 5000, 8), ms(0));

    assert_eq!(sched.queued(Direction::Read), 1);
    assert_eq!(sched.dispatch(ms(1)).map(|rq| rq.id), Some(id(3)));
}
