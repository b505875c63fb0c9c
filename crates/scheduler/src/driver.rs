//! Tick driver: bounded-interval loop around the scheduler.

use std::time::{Duration, Instant};

use contracts::{SignalDecision, Transition};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SchedulerError};
use crate::scheduler::SignalScheduler;

/// Which decisions are forwarded to the consumer channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ForwardPolicy {
    /// Only decisions carrying a transition
    #[default]
    Changes,
    /// Every tick
    All,
}

impl ForwardPolicy {
    fn accepts(self, decision: &SignalDecision) -> bool {
        match self {
            ForwardPolicy::Changes => decision.changed(),
            ForwardPolicy::All => true,
        }
    }
}

/// Counters reported when the driver exits.
#[derive(Debug, Clone, Default)]
pub struct DriverStats {
    /// Ticks executed
    pub ticks: u64,
    /// Ticks that produced a transition
    pub transitions: u64,
    /// Preemptions started or handed over
    pub preemptions: u64,
    /// Decisions forwarded to the consumer channel
    pub forwarded: u64,
    /// Decisions dropped because the consumer channel was full
    pub dropped: u64,
    /// Slowest `update()` observed
    pub max_tick_latency: Duration,
    /// Wall time spent in the loop
    pub elapsed: Duration,
}

/// Caller-owned cadence wrapper around a [`SignalScheduler`].
///
/// The driver owns the scheduler, so `update()` can never run concurrently
/// with itself. Every decision is published on a `watch` channel; a consumer
/// channel additionally receives the decisions selected by [`ForwardPolicy`]
/// via `try_send`, so a slow consumer never delays a tick.
#[derive(Debug)]
pub struct TickDriver {
    scheduler: SignalScheduler,
    interval: Duration,
    max_ticks: Option<u64>,
    consumer: Option<mpsc::Sender<SignalDecision>>,
    policy: ForwardPolicy,
}

impl TickDriver {
    /// Driver ticking at the scheduler's configured interval.
    pub fn new(scheduler: SignalScheduler) -> Self {
        let interval = scheduler.config().tick_interval();
        Self {
            scheduler,
            interval,
            max_ticks: None,
            consumer: None,
            policy: ForwardPolicy::default(),
        }
    }

    /// Override the tick interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Stop on its own after `max_ticks` ticks.
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Forward decisions to `consumer`.
    pub fn with_consumer(
        mut self,
        consumer: mpsc::Sender<SignalDecision>,
        policy: ForwardPolicy,
    ) -> Self {
        self.consumer = Some(consumer);
        self.policy = policy;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the loop on the current runtime.
    pub fn spawn(self) -> DriverHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (decision_tx, decision_rx) = watch::channel(self.scheduler.current());
        let join = tokio::spawn(self.run(stop_rx, decision_tx));

        DriverHandle {
            stop_tx,
            decisions: decision_rx,
            join,
        }
    }

    /// Run the loop until `stop` flips to true, the stop sender is dropped, or
    /// `max_ticks` is reached. A tick in progress always completes.
    #[instrument(name = "tick_driver", skip_all, fields(interval_ms = self.interval.as_millis() as u64))]
    pub async fn run(
        mut self,
        mut stop: watch::Receiver<bool>,
        publish: watch::Sender<SignalDecision>,
    ) -> DriverStats {
        let mut stats = DriverStats::default();
        let started = Instant::now();

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(max_ticks = ?self.max_ticks, "tick driver started");

        while !*stop.borrow() {
            tokio::select! {
                biased;
                changed = stop.changed() => {
                    if changed.is_err() {
                        debug!("stop handle dropped");
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            self.tick(&publish, &mut stats);

            if self.max_ticks.is_some_and(|max| stats.ticks >= max) {
                debug!(ticks = stats.ticks, "tick budget reached");
                break;
            }
        }

        stats.elapsed = started.elapsed();
        info!(
            ticks = stats.ticks,
            transitions = stats.transitions,
            preemptions = stats.preemptions,
            dropped = stats.dropped,
            "tick driver stopped"
        );
        stats
    }

    fn tick(&mut self, publish: &watch::Sender<SignalDecision>, stats: &mut DriverStats) {
        let tick_started = Instant::now();
        let decision = self.scheduler.update();
        let latency = tick_started.elapsed();

        metrics::histogram!("signal_tick_latency_ms").record(latency.as_secs_f64() * 1000.0);
        stats.ticks += 1;
        stats.max_tick_latency = stats.max_tick_latency.max(latency);
        if let Some(transition) = decision.transition {
            stats.transitions += 1;
            if matches!(
                transition,
                Transition::PreemptionStarted { .. } | Transition::PreemptionHandover { .. }
            ) {
                stats.preemptions += 1;
            }
        }

        publish.send_replace(decision);
        self.forward(decision, stats);
    }

    fn forward(&mut self, decision: SignalDecision, stats: &mut DriverStats) {
        let Some(consumer) = &self.consumer else {
            return;
        };
        if !self.policy.accepts(&decision) {
            return;
        }

        match consumer.try_send(decision) {
            Ok(()) => stats.forwarded += 1,
            Err(mpsc::error::TrySendError::Full(_)) => {
                stats.dropped += 1;
                warn!(tick = decision.tick, "decision consumer full, dropping decision");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("decision consumer closed, forwarding disabled");
                self.consumer = None;
            }
        }
    }
}

/// Handle to a spawned [`TickDriver`].
#[derive(Debug)]
pub struct DriverHandle {
    stop_tx: watch::Sender<bool>,
    decisions: watch::Receiver<SignalDecision>,
    join: JoinHandle<DriverStats>,
}

impl DriverHandle {
    /// Ask the loop to exit after the tick in progress.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Most recently published decision.
    pub fn latest(&self) -> SignalDecision {
        *self.decisions.borrow()
    }

    /// New receiver for published decisions.
    pub fn subscribe(&self) -> watch::Receiver<SignalDecision> {
        self.decisions.clone()
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the loop and wait for it to exit.
    ///
    /// # Errors
    /// Returns `SchedulerError::Driver` if the loop panicked.
    pub async fn shutdown(self) -> Result<DriverStats> {
        self.stop();
        self.join().await
    }

    /// Wait for the loop to exit on its own (tick budget or stop).
    ///
    /// # Errors
    /// Returns `SchedulerError::Driver` if the loop panicked.
    pub async fn join(self) -> Result<DriverStats> {
        self.join
            .await
            .map_err(|err| SchedulerError::Driver(err.to_string()))
    }
}
