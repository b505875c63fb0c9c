//! Source registry - binds detection sources to the store

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{DetectionCallback, DetectionSource};
use detection_store::DetectionStore;
use tracing::{debug, info, instrument, trace};

use crate::error::{IngestionError, Result};
use crate::metrics::IngestionMetrics;

/// Source registry
///
/// Owns the registered sources. Each source writes straight into the store
/// from its own thread; sources never talk to each other or to the scheduler.
pub struct SourceRegistry {
    /// Registered sources, keyed by source id
    sources: HashMap<String, Box<dyn DetectionSource>>,

    /// Store every report is applied to
    store: Arc<DetectionStore>,

    /// Shared metrics
    metrics: Arc<IngestionMetrics>,
}

impl SourceRegistry {
    /// Create an empty registry writing into `store`
    pub fn new(store: Arc<DetectionStore>) -> Self {
        Self {
            sources: HashMap::new(),
            store,
            metrics: Arc::new(IngestionMetrics::new()),
        }
    }

    /// Register a detection source
    ///
    /// # Errors
    /// `IngestionError::AlreadyRegistered` if the id is taken.
    #[instrument(
        name = "ingestion_register_source",
        skip(self, source),
        fields(source_id = %source.source_id(), kind = source.sensor_kind().as_str())
    )]
    pub fn register(&mut self, source: Box<dyn DetectionSource>) -> Result<()> {
        let source_id = source.source_id().to_string();
        if self.sources.contains_key(&source_id) {
            return Err(IngestionError::AlreadyRegistered { source_id });
        }

        debug!(source_id = %source_id, "registered detection source");
        self.sources.insert(source_id, source);
        Ok(())
    }

    /// Start all registered sources
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) {
        info!(count = self.sources.len(), "starting all detection sources");
        for (source_id, source) in &self.sources {
            self.start_source(source_id, source.as_ref());
        }
    }

    /// Stop all sources
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.sources.len(), "stopping all detection sources");
        for (source_id, source) in &self.sources {
            if source.is_listening() {
                debug!(source_id = %source_id, "stopping source");
            }
            // also reaps sources whose playback already finished
            source.stop();
        }
    }

    fn start_source(&self, source_id: &str, source: &dyn DetectionSource) {
        if source.is_listening() {
            return;
        }

        debug!(source_id = %source_id, "starting source");
        let store = self.store.clone();
        let metrics = self.metrics.clone();
        let id = source_id.to_string();

        let callback: DetectionCallback = Arc::new(move |report| {
            metrics.record(&report);
            trace!(source_id = %id, ?report, "detection report");
            store.apply(&report);
        });

        source.listen(callback);
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Get registered source count
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Check if any source is still producing reports
    pub fn any_listening(&self) -> bool {
        self.sources.values().any(|s| s.is_listening())
    }

    /// Check if specified source is listening
    pub fn is_source_listening(&self, source_id: &str) -> bool {
        self.sources
            .get(source_id)
            .map(|s| s.is_listening())
            .unwrap_or(false)
    }
}

impl Drop for SourceRegistry {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::{ReplayConfig, ReplaySource, TimedReport};
    use contracts::{DetectionReport, Lane, ManualClock, SensorKind};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    /// Source that emits one report synchronously on listen
    struct OneShotSource {
        id: String,
        report: DetectionReport,
        listening: AtomicBool,
    }

    impl OneShotSource {
        fn new(id: &str, report: DetectionReport) -> Self {
            Self {
                id: id.to_string(),
                report,
                listening: AtomicBool::new(false),
            }
        }
    }

    impl DetectionSource for OneShotSource {
        fn source_id(&self) -> &str {
            &self.id
        }

        fn sensor_kind(&self) -> SensorKind {
            self.report.sensor_kind()
        }

        fn listen(&self, callback: DetectionCallback) {
            self.listening.store(true, Ordering::SeqCst);
            callback(self.report);
        }

        fn stop(&self) {
            self.listening.store(false, Ordering::SeqCst);
        }

        fn is_listening(&self) -> bool {
            self.listening.load(Ordering::SeqCst)
        }
    }

    fn store() -> Arc<DetectionStore> {
        DetectionStore::shared(Arc::new(ManualClock::new()))
    }

    #[test]
    fn test_registry_creation() {
        let registry = SourceRegistry::new(store());
        assert_eq!(registry.source_count(), 0);
        assert!(!registry.any_listening());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = SourceRegistry::new(store());
        registry
            .register(Box::new(OneShotSource::new(
                "cam",
                DetectionReport::lane(Lane::North, true),
            )))
            .unwrap();

        let err = registry
            .register(Box::new(OneShotSource::new(
                "cam",
                DetectionReport::siren(true),
            )))
            .unwrap_err();
        assert!(matches!(err, IngestionError::AlreadyRegistered { .. }));
        assert_eq!(registry.source_count(), 1);
    }

    #[test]
    fn test_reports_reach_store() {
        let store = store();
        let mut registry = SourceRegistry::new(store.clone());
        registry
            .register(Box::new(OneShotSource::new(
                "cam",
                DetectionReport::lane(Lane::West, true),
            )))
            .unwrap();
        registry
            .register(Box::new(OneShotSource::new(
                "mic",
                DetectionReport::siren(true),
            )))
            .unwrap();

        registry.start_all();
        assert!(registry.is_source_listening("cam"));

        let snapshot = store.snapshot().unwrap();
        assert!(snapshot.lane_detected(Lane::West));
        assert!(snapshot.siren);

        let metrics = registry.metrics().snapshot();
        assert_eq!(metrics.reports_received, 2);
        assert_eq!(metrics.positive_reports, 2);

        registry.stop_all();
        assert!(!registry.any_listening());
    }

    #[test]
    fn test_replay_feeds_store() {
        let store = store();
        let mut registry = SourceRegistry::new(store.clone());
        let source = ReplaySource::from_events(
            "cam",
            SensorKind::Vision,
            vec![
                TimedReport::new(0.0, DetectionReport::lane(Lane::South, true)),
                TimedReport::new(0.01, DetectionReport::lane(Lane::East, true)),
            ],
            ReplayConfig::default(),
        );
        registry.register(Box::new(source)).unwrap();
        registry.start_all();

        let deadline = Instant::now() + Duration::from_secs(2);
        while registry.any_listening() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }

        let snapshot = store.snapshot().unwrap();
        assert!(snapshot.lane_detected(Lane::South));
        assert!(snapshot.lane_detected(Lane::East));
        assert_eq!(registry.metrics().snapshot().lane_reports, 2);
    }
}
