//! Per-sink delivery counters
//!
//! Every counter update is mirrored to the `metrics` facade as
//! `signal_decisions_dispatched_total{sink, status}`.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single sink
#[derive(Debug)]
pub struct SinkMetrics {
    /// Sink name (metrics label)
    sink: String,
    /// Current queue length
    queue_len: AtomicUsize,
    /// Total successful writes
    write_count: AtomicU64,
    /// Total write failures
    failure_count: AtomicU64,
    /// Decisions turned away by a backlog full of transitions
    dropped_count: AtomicU64,
    /// Routine ticks evicted to make room in a full backlog
    displaced_count: AtomicU64,
    /// Tick of the last decision written
    last_tick: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance for `sink`
    pub fn new(sink: impl Into<String>) -> Self {
        Self {
            sink: sink.into(),
            queue_len: AtomicUsize::new(0),
            write_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
            displaced_count: AtomicU64::new(0),
            last_tick: AtomicU64::new(0),
        }
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    /// Record a decision written by the sink
    pub fn record_written(&self, tick: u64) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.last_tick.fetch_max(tick, Ordering::Relaxed);
        self.emit("ok");
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Record a failed write
    pub fn record_failed(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        self.emit("failed");
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    /// Record a decision the sink never received
    pub fn record_dropped(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
        self.emit("dropped");
    }

    pub fn displaced_count(&self) -> u64 {
        self.displaced_count.load(Ordering::Relaxed)
    }

    /// Record a queued routine tick evicted by a newer decision
    pub fn record_displaced(&self) {
        self.displaced_count.fetch_add(1, Ordering::Relaxed);
        self.emit("displaced");
    }

    pub fn last_tick(&self) -> u64 {
        self.last_tick.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            write_count: self.write_count(),
            failure_count: self.failure_count(),
            dropped_count: self.dropped_count(),
            displaced_count: self.displaced_count(),
            last_tick: self.last_tick(),
        }
    }

    fn emit(&self, status: &'static str) {
        ::metrics::counter!(
            "signal_decisions_dispatched_total",
            "sink" => self.sink.clone(),
            "status" => status
        )
        .increment(1);
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub write_count: u64,
    pub failure_count: u64,
    pub dropped_count: u64,
    pub displaced_count: u64,
    pub last_tick: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = SinkMetrics::new("log");
        metrics.record_written(4);
        metrics.record_written(2);
        metrics.record_dropped();
        metrics.record_displaced();
        metrics.record_displaced();
        metrics.set_queue_len(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.write_count, 2);
        assert_eq!(snapshot.dropped_count, 1);
        assert_eq!(snapshot.displaced_count, 2);
        assert_eq!(snapshot.failure_count, 0);
        assert_eq!(snapshot.queue_len, 3);
        assert_eq!(snapshot.last_tick, 4);
    }
}
