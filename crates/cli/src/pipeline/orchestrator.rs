//! Controller orchestrator - wires store, sources, scheduler and sinks.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{ControllerBlueprint, MonotonicClock, SensorKind, SignalDecision};
use detection_store::DetectionStore;
use ingestion::{ReplayConfig, ReplaySource, SourceRegistry};
use scheduler::{ForwardPolicy, SignalScheduler, TickDriver};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{PipelineStats, StopReason};
use crate::error::{CliError, Result};

/// How long the dispatcher may take to drain after the driver stops
const DISPATCHER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Controller blueprint
    pub blueprint: ControllerBlueprint,

    /// Maximum number of ticks (None = unlimited)
    pub max_ticks: Option<u64>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Channel buffer size
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Detection recording to replay
    pub replay_path: Option<PathBuf>,

    /// Replay speed multiplier (1.0 = recorded speed)
    pub replay_speed: f64,

    /// Loop replay when finished
    pub replay_loop: bool,

    /// Dispatch every tick instead of transitions only
    pub every_tick: bool,
}

/// Main controller orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, the timeout expires or the tick budget
    /// is used up, then stop every stage in order and collect statistics.
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let clock = MonotonicClock::shared();
        let store = DetectionStore::shared(clock.clone());

        let registry = self.build_registry(&store)?;

        let scheduler = SignalScheduler::new(blueprint.scheduler.clone(), store.clone(), clock)?;
        info!(
            intersection = %blueprint.intersection.name,
            green_s = blueprint.scheduler.green_time_s,
            yellow_s = blueprint.scheduler.yellow_time_s,
            buffer_s = blueprint.scheduler.post_priority_buffer_s,
            tick_ms = blueprint.scheduler.tick_interval_ms,
            "Scheduler configured"
        );

        // Dispatcher
        let buffer_size = self.config.buffer_size.max(1);
        let (sink_tx, sink_rx) = mpsc::channel::<SignalDecision>(buffer_size);
        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - decisions will not be recorded");
        }
        let dispatcher = dispatcher::create_dispatcher(blueprint.sinks.clone(), sink_rx)?;
        let dispatcher_handle = dispatcher.spawn();
        info!(active_sinks = blueprint.sinks.len(), "Dispatcher started");

        // Driver
        let (decision_tx, mut decision_rx) = mpsc::channel::<SignalDecision>(buffer_size);
        let mut driver = TickDriver::new(scheduler).with_consumer(decision_tx, ForwardPolicy::All);
        if let Some(max) = self.config.max_ticks {
            driver = driver.with_max_ticks(max);
        }

        registry.start_all();
        let driver_handle = driver.spawn();
        info!(max_ticks = ?self.config.max_ticks, "Controller running");

        let mut stats = PipelineStats {
            active_sources: registry.source_count(),
            active_sinks: blueprint.sinks.len(),
            ..Default::default()
        };

        let timeout = self.config.timeout;
        let deadline = async move {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(shutdown);
        tokio::pin!(deadline);

        let stop_reason = loop {
            tokio::select! {
                _ = &mut shutdown => break StopReason::Signal,
                _ = &mut deadline => {
                    warn!(?timeout, "Run timed out");
                    break StopReason::Timeout;
                }
                decision = decision_rx.recv() => match decision {
                    Some(decision) => self.consume(decision, &sink_tx, &mut stats),
                    None => break StopReason::Completed,
                },
            }
        };
        stats.stop_reason = stop_reason;

        // Shutdown: driver first so every decision it produced is consumed
        info!(reason = %stats.stop_reason, "Shutting down controller...");
        driver_handle.stop();
        while let Some(decision) = decision_rx.recv().await {
            self.consume(decision, &sink_tx, &mut stats);
        }
        stats.driver = driver_handle.join().await?;

        registry.stop_all();
        stats.ingestion = registry.metrics().snapshot();
        stats.store = store.stats();

        drop(sink_tx);
        match tokio::time::timeout(DISPATCHER_DRAIN_TIMEOUT, dispatcher_handle).await {
            Ok(Ok(sinks)) => stats.sinks = sinks,
            Ok(Err(e)) => {
                return Err(CliError::shutdown(format!("dispatcher task failed: {e}")));
            }
            Err(_) => warn!(
                timeout_secs = DISPATCHER_DRAIN_TIMEOUT.as_secs(),
                "Dispatcher did not drain in time"
            ),
        }

        stats.duration = start_time.elapsed();
        info!(
            duration_secs = stats.duration.as_secs_f64(),
            ticks = stats.driver.ticks,
            preemptions = stats.driver.preemptions,
            "Controller shutdown complete"
        );

        Ok(stats)
    }

    /// Register one replay source per sensor kind present in the recording.
    fn build_registry(&self, store: &Arc<DetectionStore>) -> Result<SourceRegistry> {
        let mut registry = SourceRegistry::new(Arc::clone(store));

        let Some(path) = &self.config.replay_path else {
            warn!("No detection recording given - running round-robin only");
            return Ok(registry);
        };

        let replay_config = ReplayConfig {
            speed_multiplier: self.config.replay_speed,
            loop_playback: self.config.replay_loop,
        };

        for kind in [SensorKind::Vision, SensorKind::Audio] {
            let source_id = format!("replay-{}", kind.as_str());
            let source = ReplaySource::load(path, source_id, kind, replay_config.clone())?;
            if source.events().is_empty() {
                debug!(kind = kind.as_str(), "Recording has no events of this kind");
                continue;
            }
            registry.register(Box::new(source))?;
        }

        info!(
            path = %path.display(),
            sources = registry.source_count(),
            speed = self.config.replay_speed,
            looping = self.config.replay_loop,
            "Detection replay configured"
        );
        Ok(registry)
    }

    /// Account for one decision and pass it on to the dispatcher.
    ///
    /// Never waits on the dispatcher: a stalled consume loop would make the
    /// driver drop ticks and skew the per-lane timing totals.
    fn consume(
        &self,
        decision: SignalDecision,
        sink_tx: &mpsc::Sender<SignalDecision>,
        stats: &mut PipelineStats,
    ) {
        observability::record_decision(&decision);
        stats.decisions.update(&decision);

        if let Some(transition) = decision.transition {
            debug!(
                tick = decision.tick,
                t = format!("{:.2}", decision.at_secs()),
                transition = transition.label(),
                mode = %decision.mode,
                "Signal transition"
            );
        }

        if !(decision.changed() || self.config.every_tick) {
            return;
        }
        match sink_tx.try_send(decision) {
            Ok(()) => stats.decisions_dispatched += 1,
            Err(mpsc::error::TrySendError::Full(decision)) => {
                stats.dispatch_dropped += 1;
                warn!(tick = decision.tick, "Dispatcher backlog full, decision not recorded");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => warn!("Dispatcher channel closed"),
        }
    }
}
