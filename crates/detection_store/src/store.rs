//! Mutex-guarded detection record.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{
    ContractError, DetectionReport, DetectionSnapshot, Lane, SensorKind, SharedClock,
};
use tracing::{trace, warn};

use crate::error::{Result, StoreError};

/// Write counters
#[derive(Debug, Default)]
pub struct StoreStats {
    /// Committed lane writes
    lane_writes: AtomicU64,
    /// Committed siren writes
    siren_writes: AtomicU64,
    /// Lane identifiers rejected at the string boundary
    invalid_lanes: AtomicU64,
    /// Writes dropped because the store was poisoned
    dropped_writes: AtomicU64,
}

impl StoreStats {
    pub fn snapshot(&self) -> StoreStatsSnapshot {
        StoreStatsSnapshot {
            lane_writes: self.lane_writes.load(Ordering::Relaxed),
            siren_writes: self.siren_writes.load(Ordering::Relaxed),
            invalid_lanes: self.invalid_lanes.load(Ordering::Relaxed),
            dropped_writes: self.dropped_writes.load(Ordering::Relaxed),
        }
    }

    fn record_write(&self, kind: SensorKind) {
        match kind {
            SensorKind::Vision => self.lane_writes.fetch_add(1, Ordering::Relaxed),
            SensorKind::Audio => self.siren_writes.fetch_add(1, Ordering::Relaxed),
        };
    }
}

/// Snapshot of store counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStatsSnapshot {
    pub lane_writes: u64,
    pub siren_writes: u64,
    pub invalid_lanes: u64,
    pub dropped_writes: u64,
}

/// Concurrency-safe detection state.
///
/// Every operation takes the single lock only long enough to copy or patch a
/// small `Copy` record, so a reader never observes a half-applied write and a
/// slow sensor cannot hold up the scheduler.
#[derive(Debug)]
pub struct DetectionStore {
    record: Mutex<DetectionSnapshot>,
    clock: SharedClock,
    stats: StoreStats,
}

impl DetectionStore {
    /// Create an empty store (nothing detected, no emergency seen).
    pub fn new(clock: SharedClock) -> Self {
        Self {
            record: Mutex::new(DetectionSnapshot::default()),
            clock,
            stats: StoreStats::default(),
        }
    }

    /// Create a store behind an `Arc`, ready to hand to sensor adapters.
    pub fn shared(clock: SharedClock) -> Arc<Self> {
        Arc::new(Self::new(clock))
    }

    /// Clock used to stamp emergency signals.
    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Vision update for one lane.
    pub fn set_lane_detected(&self, lane: Lane, detected: bool) {
        self.set_lane_detection(lane, detected, None);
    }

    /// Vision update carrying the detector's confidence.
    ///
    /// Confidence is clamped to `[0, 1]` and only kept while `detected` is true.
    pub fn set_lane_detection(&self, lane: Lane, detected: bool, confidence: Option<f32>) {
        let now = self.clock.now();
        let confidence = if detected {
            confidence
                .filter(|c| c.is_finite())
                .map(|c| c.clamp(0.0, 1.0))
        } else {
            None
        };

        self.write(SensorKind::Vision, |record| {
            let idx = lane.index();
            record.lanes[idx] = detected;
            record.confidence[idx] = confidence;
            if detected {
                stamp_emergency(record, now);
            }
        });

        trace!(lane = %lane, detected, ?confidence, "lane detection written");
    }

    /// Vision update addressed by a textual lane id (`"N"`, `"north"`, ...).
    ///
    /// # Errors
    /// `ContractError::InvalidLane` if `lane_id` names no lane; the store is
    /// left untouched.
    pub fn set_lane_detected_by_id(
        &self,
        lane_id: &str,
        detected: bool,
    ) -> std::result::Result<(), ContractError> {
        let lane = lane_id.parse::<Lane>().inspect_err(|_| {
            self.stats.invalid_lanes.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("detection_invalid_lane_total").increment(1);
            warn!(lane_id = %lane_id, "rejected detection for unknown lane");
        })?;
        self.set_lane_detected(lane, detected);
        Ok(())
    }

    /// Audio update.
    pub fn set_siren_detected(&self, detected: bool) {
        let now = self.clock.now();
        self.write(SensorKind::Audio, |record| {
            record.siren = detected;
            if detected {
                stamp_emergency(record, now);
            }
        });

        trace!(detected, "siren detection written");
    }

    /// Apply a report from a [`contracts::DetectionSource`].
    pub fn apply(&self, report: &DetectionReport) {
        match *report {
            DetectionReport::Lane {
                lane,
                detected,
                confidence,
            } => self.set_lane_detection(lane, detected, confidence),
            DetectionReport::Siren { detected } => self.set_siren_detected(detected),
        }
    }

    /// Consistent copy of every detection field.
    ///
    /// # Errors
    /// `StoreError::Poisoned` if a writer panicked inside the critical section.
    pub fn snapshot(&self) -> Result<DetectionSnapshot> {
        self.record
            .lock()
            .map(|record| *record)
            .map_err(|_| StoreError::Poisoned)
    }

    /// Write counters.
    pub fn stats(&self) -> StoreStatsSnapshot {
        self.stats.snapshot()
    }

    fn write(&self, kind: SensorKind, patch: impl FnOnce(&mut DetectionSnapshot)) {
        match self.record.lock() {
            Ok(mut record) => {
                patch(&mut record);
                record.version += 1;
            }
            Err(_) => {
                self.stats.dropped_writes.fetch_add(1, Ordering::Relaxed);
                warn!(kind = kind.as_str(), "detection store poisoned, write dropped");
                return;
            }
        }

        self.stats.record_write(kind);
        metrics::counter!("detection_writes_total", "kind" => kind.as_str()).increment(1);
    }
}

/// Writers read the clock before taking the lock, so two racing writers may
/// commit out of time order; keep the latest stamp.
fn stamp_emergency(record: &mut DetectionSnapshot, now: Duration) {
    record.last_emergency = Some(record.last_emergency.map_or(now, |prev| prev.max(now)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ManualClock;
    use std::thread;

    fn store_with_clock() -> (Arc<DetectionStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let store = DetectionStore::shared(clock.clone());
        (store, clock)
    }

    #[test]
    fn test_initial_snapshot_is_empty() {
        let (store, _) = store_with_clock();
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot, DetectionSnapshot::default());
    }

    #[test]
    fn test_lane_detection_stamps_emergency_time() {
        let (store, clock) = store_with_clock();
        clock.set_secs(10.0);

        store.set_lane_detected(Lane::South, true);

        let snapshot = store.snapshot().unwrap();
        assert!(snapshot.lane_detected(Lane::South));
        assert_eq!(snapshot.last_emergency, Some(Duration::from_secs(10)));
        assert_eq!(snapshot.version, 1);
    }

    #[test]
    fn test_clearing_does_not_stamp() {
        let (store, clock) = store_with_clock();
        clock.set_secs(3.0);
        store.set_lane_detected(Lane::East, true);
        clock.set_secs(8.0);
        store.set_lane_detected(Lane::East, false);
        store.set_siren_detected(false);

        let snapshot = store.snapshot().unwrap();
        assert!(!snapshot.any_lane_detected());
        assert_eq!(snapshot.last_emergency, Some(Duration::from_secs(3)));
        assert_eq!(snapshot.version, 3);
    }

    #[test]
    fn test_siren_stamps_without_selecting_lane() {
        let (store, clock) = store_with_clock();
        clock.set_secs(4.0);
        store.set_siren_detected(true);

        let snapshot = store.snapshot().unwrap();
        assert!(snapshot.siren);
        assert!(!snapshot.any_lane_detected());
        assert_eq!(snapshot.last_emergency, Some(Duration::from_secs(4)));
    }

    #[test]
    fn test_confidence_clamped_and_cleared() {
        let (store, _) = store_with_clock();
        store.set_lane_detection(Lane::West, true, Some(1.7));
        assert_eq!(store.snapshot().unwrap().confidence(Lane::West), Some(1.0));

        store.set_lane_detection(Lane::West, true, Some(f32::NAN));
        assert_eq!(store.snapshot().unwrap().confidence(Lane::West), None);

        store.set_lane_detection(Lane::West, false, Some(0.9));
        assert_eq!(store.snapshot().unwrap().confidence(Lane::West), None);
    }

    #[test]
    fn test_invalid_lane_id_rejected() {
        let (store, _) = store_with_clock();

        let err = store.set_lane_detected_by_id("northeast", true).unwrap_err();
        assert!(matches!(err, ContractError::InvalidLane { .. }));

        let snapshot = store.snapshot().unwrap();
        assert!(!snapshot.any_lane_detected());
        assert_eq!(snapshot.version, 0);
        assert_eq!(store.stats().invalid_lanes, 1);

        store.set_lane_detected_by_id("S", true).unwrap();
        assert!(store.snapshot().unwrap().lane_detected(Lane::South));
    }

    #[test]
    fn test_apply_reports() {
        let (store, _) = store_with_clock();
        store.apply(&DetectionReport::lane(Lane::North, true));
        store.apply(&DetectionReport::siren(true));

        let snapshot = store.snapshot().unwrap();
        assert!(snapshot.lane_detected(Lane::North));
        assert!(snapshot.siren);

        let stats = store.stats();
        assert_eq!(stats.lane_writes, 1);
        assert_eq!(stats.siren_writes, 1);
    }

    #[test]
    fn test_concurrent_writers_produce_consistent_snapshots() {
        let (store, clock) = store_with_clock();
        clock.set_secs(1.0);

        let writers: Vec<_> = Lane::ALL
            .into_iter()
            .map(|lane| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..500 {
                        store.set_lane_detected(lane, i % 2 == 0);
                    }
                })
            })
            .collect();

        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut last_version = 0;
                for _ in 0..500 {
                    let snapshot = store.snapshot().unwrap();
                    // a detected lane always comes with its emergency stamp
                    if snapshot.any_lane_detected() {
                        assert!(snapshot.last_emergency.is_some());
                    }
                    assert!(snapshot.version >= last_version);
                    last_version = snapshot.version;
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.version, 4 * 500);
        // last write per lane is i = 499 -> false
        assert!(!snapshot.any_lane_detected());
    }

    #[test]
    fn test_poisoned_store_fails_reads_and_drops_writes() {
        let (store, _) = store_with_clock();

        let poisoner = Arc::clone(&store);
        let _ = thread::spawn(move || {
            let _guard = poisoner.record.lock().unwrap();
            panic!("sensor adapter crashed mid-write");
        })
        .join();

        assert!(matches!(store.snapshot(), Err(StoreError::Poisoned)));

        store.set_lane_detected(Lane::North, true);
        assert_eq!(store.stats().dropped_writes, 1);
        assert_eq!(store.stats().lane_writes, 0);
    }
}
