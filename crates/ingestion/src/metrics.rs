//! Source report counters

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::DetectionReport;

/// Ingestion metrics shared by every registered source
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Total reports received
    pub reports_received: AtomicU64,

    /// Per-lane vision reports
    pub lane_reports: AtomicU64,

    /// Siren reports
    pub siren_reports: AtomicU64,

    /// Reports asserting an emergency
    pub positive_reports: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one report
    pub fn record(&self, report: &DetectionReport) {
        self.reports_received.fetch_add(1, Ordering::Relaxed);
        match report {
            DetectionReport::Lane { .. } => self.lane_reports.fetch_add(1, Ordering::Relaxed),
            DetectionReport::Siren { .. } => self.siren_reports.fetch_add(1, Ordering::Relaxed),
        };
        if report.is_positive() {
            self.positive_reports.fetch_add(1, Ordering::Relaxed);
        }

        ::metrics::counter!(
            "detection_reports_total",
            "kind" => report.sensor_kind().as_str(),
            "positive" => if report.is_positive() { "true" } else { "false" }
        )
        .increment(1);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reports_received: self.reports_received.load(Ordering::Relaxed),
            lane_reports: self.lane_reports.load(Ordering::Relaxed),
            siren_reports: self.siren_reports.load(Ordering::Relaxed),
            positive_reports: self.positive_reports.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub reports_received: u64,
    pub lane_reports: u64,
    pub siren_reports: u64,
    pub positive_reports: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Lane;

    #[test]
    fn test_record_counts_by_kind() {
        let metrics = IngestionMetrics::new();
        metrics.record(&DetectionReport::lane(Lane::North, true));
        metrics.record(&DetectionReport::lane(Lane::North, false));
        metrics.record(&DetectionReport::siren(true));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.reports_received, 3);
        assert_eq!(snapshot.lane_reports, 2);
        assert_eq!(snapshot.siren_reports, 1);
        assert_eq!(snapshot.positive_reports, 2);
    }
}
