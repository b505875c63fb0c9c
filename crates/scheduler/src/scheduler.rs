//! Signal scheduler state machine.

use std::sync::Arc;
use std::time::Duration;

use contracts::{
    ControllerMode, DetectionSnapshot, Lane, LaneLights, LightState, SchedulerConfig,
    SharedClock, SignalDecision, Transition,
};
use detection_store::DetectionReader;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::round_robin::PhaseClock;

/// Lane currently holding the emergency override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Preemption {
    lane: Lane,
    since: Duration,
}

/// Emergency preemption scheduler.
///
/// Owns the schedule state exclusively; `update` takes `&mut self`, so ticks
/// are single-flight by construction.
#[derive(Debug)]
pub struct SignalScheduler {
    config: SchedulerConfig,
    reader: Arc<dyn DetectionReader>,
    clock: SharedClock,
    /// Round-robin pointer, frozen while a preemption is active
    round_robin: PhaseClock,
    preemption: Option<Preemption>,
    /// Last published decision
    current: SignalDecision,
    store_read_failures: u64,
}

impl SignalScheduler {
    /// Create a scheduler in NORMAL mode with North GREEN.
    ///
    /// # Errors
    /// Returns `SchedulerError::Config` if `config` fails validation.
    pub fn new(
        config: SchedulerConfig,
        reader: Arc<dyn DetectionReader>,
        clock: SharedClock,
    ) -> Result<Self> {
        config.validate()?;

        let now = clock.now();
        let first = Lane::North;
        let round_robin =
            PhaseClock::new(first, now, config.green_time(), config.yellow_time());

        let current = SignalDecision {
            tick: 0,
            at: now,
            lights: LaneLights::only(first, LightState::Green),
            mode: ControllerMode::Normal,
            priority_lane: None,
            phase_lane: first,
            transition: None,
            detected: [false; Lane::COUNT],
            siren: false,
            snapshot_version: 0,
        };

        info!(
            green_s = config.green_time_s,
            yellow_s = config.yellow_time_s,
            buffer_s = config.post_priority_buffer_s,
            order = ?config.priority_order,
            "signal scheduler started, {} GREEN",
            first
        );
        metrics::gauge!("signal_mode").set(0.0);

        Ok(Self {
            config,
            reader,
            clock,
            round_robin,
            preemption: None,
            current,
            store_read_failures: 0,
        })
    }

    /// Run one tick against a fresh snapshot and the current clock time.
    ///
    /// An unreadable store is treated as "nothing detected", which steers
    /// the controller back to NORMAL rather than freezing it.
    pub fn update(&mut self) -> SignalDecision {
        let snapshot = match self.reader.snapshot() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.store_read_failures += 1;
                metrics::counter!("signal_store_read_failures_total").increment(1);
                warn!(error = %err, "detection store unreadable, assuming no detections");
                DetectionSnapshot::default()
            }
        };
        let now = self.clock.now();
        self.decide(&snapshot, now)
    }

    /// Run one tick against an explicit snapshot and time.
    ///
    /// `now` earlier than the previous tick is clamped to it.
    #[instrument(
        level = "trace",
        name = "scheduler_decide",
        skip(self, snapshot),
        fields(tick = self.current.tick + 1, version = snapshot.version)
    )]
    pub fn decide(&mut self, snapshot: &DetectionSnapshot, now: Duration) -> SignalDecision {
        let now = now.max(self.current.at);
        let candidate = snapshot.first_detected(&self.config.priority_order);

        let transition = match self.preemption {
            None => match candidate {
                Some(lane) => {
                    // pointer reflects the lane that was active at `now`
                    self.round_robin.advance(now);
                    Some(self.begin_preemption(lane, now, snapshot))
                }
                None => self.advance_round_robin(now),
            },
            // first-detected-wins: hold while the preempting lane is detected
            Some(active) if snapshot.lane_detected(active.lane) => None,
            Some(active) => match candidate {
                Some(next) => Some(self.hand_over(active, next, now)),
                None if self.buffer_elapsed(snapshot, now) => {
                    Some(self.end_preemption(active, now))
                }
                None => None,
            },
        };

        let lights = match self.preemption {
            Some(active) => LaneLights::only(active.lane, LightState::Green),
            None => LaneLights::only(self.round_robin.lane(), self.round_robin.state_at(now)),
        };
        self.check_invariants(&lights);

        let decision = SignalDecision {
            tick: self.current.tick + 1,
            at: now,
            lights,
            mode: self.mode(),
            priority_lane: self.priority_lane(),
            phase_lane: self.round_robin.lane(),
            transition,
            detected: snapshot.lanes,
            siren: snapshot.siren,
            snapshot_version: snapshot.version,
        };

        self.record(&decision);
        self.current = decision;
        decision
    }

    /// Current light per lane.
    pub fn lights(&self) -> LaneLights {
        self.current.lights
    }

    pub fn mode(&self) -> ControllerMode {
        if self.preemption.is_some() {
            ControllerMode::Priority
        } else {
            ControllerMode::Normal
        }
    }

    /// Lane holding the override, `None` in NORMAL.
    pub fn priority_lane(&self) -> Option<Lane> {
        self.preemption.map(|p| p.lane)
    }

    /// When the active override began.
    pub fn priority_since(&self) -> Option<Duration> {
        self.preemption.map(|p| p.since)
    }

    /// Last decision (tick 0 before the first update).
    pub fn current(&self) -> SignalDecision {
        self.current
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Number of ticks that fell back to an empty snapshot.
    pub fn store_read_failures(&self) -> u64 {
        self.store_read_failures
    }

    fn advance_round_robin(&mut self, now: Duration) -> Option<Transition> {
        let previous = self.current.lights.active();
        let crossed = self.round_robin.advance(now);
        let lane = self.round_robin.lane();
        let state = self.round_robin.state_at(now);

        if crossed == 0 && previous == Some((lane, state)) {
            return None;
        }

        debug!(lane = %lane, state = ?state, crossed, "round-robin phase change");
        Some(match state {
            LightState::Green => Transition::PhaseGreen { lane },
            _ => Transition::PhaseYellow { lane },
        })
    }

    fn begin_preemption(
        &mut self,
        lane: Lane,
        now: Duration,
        snapshot: &DetectionSnapshot,
    ) -> Transition {
        self.preemption = Some(Preemption { lane, since: now });

        info!(
            lane = %lane,
            interrupted = %self.round_robin.lane(),
            confidence = ?snapshot.confidence(lane),
            siren = snapshot.siren,
            "emergency preemption started"
        );
        metrics::counter!("signal_preemptions_total", "lane" => lane.code()).increment(1);

        Transition::PreemptionStarted { lane }
    }

    fn hand_over(&mut self, from: Preemption, to: Lane, now: Duration) -> Transition {
        self.preemption = Some(Preemption { lane: to, since: now });

        info!(
            from = %from.lane,
            to = %to,
            held_s = now.saturating_sub(from.since).as_secs_f64(),
            "preempting lane cleared, handing over"
        );
        metrics::counter!("signal_preemptions_total", "lane" => to.code()).increment(1);

        Transition::PreemptionHandover {
            from: from.lane,
            to,
        }
    }

    fn end_preemption(&mut self, active: Preemption, now: Duration) -> Transition {
        self.preemption = None;
        self.round_robin.restart(now);
        let resumed = self.round_robin.lane();

        info!(
            lane = %active.lane,
            resumed = %resumed,
            held_s = now.saturating_sub(active.since).as_secs_f64(),
            "emergency preemption cleared, resuming round-robin"
        );

        Transition::PreemptionCleared { resumed }
    }

    /// No emergency ever recorded counts as elapsed.
    fn buffer_elapsed(&self, snapshot: &DetectionSnapshot, now: Duration) -> bool {
        snapshot
            .since_last_emergency(now)
            .map_or(true, |since| since >= self.config.post_priority_buffer())
    }

    fn check_invariants(&self, lights: &LaneLights) {
        assert!(
            lights.is_exclusive(),
            "conflicting right-of-way computed: {lights:?}"
        );
        match self.preemption {
            Some(active) => assert_eq!(
                lights.active(),
                Some((active.lane, LightState::Green)),
                "preempting lane {} must be the only GREEN lane",
                active.lane
            ),
            None => assert!(
                lights.active().is_some(),
                "round-robin left every lane RED"
            ),
        }
    }

    fn record(&self, decision: &SignalDecision) {
        metrics::counter!("signal_ticks_total").increment(1);

        let Some(transition) = decision.transition else {
            return;
        };
        metrics::counter!("signal_transitions_total", "kind" => transition.label()).increment(1);
        if transition.is_mode_change() {
            let mode = if decision.is_priority() { 1.0 } else { 0.0 };
            metrics::gauge!("signal_mode").set(mode);
        }
    }
}
