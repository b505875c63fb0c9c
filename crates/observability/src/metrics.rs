//! Decision metrics
//!
//! Gauges mirrored from every [`SignalDecision`], plus an in-memory aggregator
//! for the end-of-run summary.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use ::metrics::gauge;
use contracts::{Lane, LaneLights, LightState, SignalDecision, Transition};

/// Mirror one decision into the metrics facade.
///
/// `signal_light_state{lane}` is 0 for RED, 1 for YELLOW and 2 for GREEN.
pub fn record_decision(decision: &SignalDecision) {
    for (lane, state) in decision.lights.iter() {
        gauge!("signal_light_state", "lane" => lane.code()).set(light_value(state));
    }
    gauge!("signal_last_tick").set(decision.tick as f64);
    gauge!("signal_snapshot_version").set(decision.snapshot_version as f64);
}

fn light_value(state: LightState) -> f64 {
    match state {
        LightState::Red => 0.0,
        LightState::Yellow => 1.0,
        LightState::Green => 2.0,
    }
}

/// Aggregates decisions in memory for a run summary.
///
/// Time between two consecutive decisions is credited to the lights shown by
/// the earlier one, so every decision of a run should be fed in order.
#[derive(Debug, Clone, Default)]
pub struct DecisionStatsAggregator {
    /// Decisions seen
    pub total_ticks: u64,
    /// Decisions taken in PRIORITY mode
    pub priority_ticks: u64,
    /// Transition counts by label
    pub transitions: BTreeMap<&'static str, u64>,
    /// Preemptions granted per lane (start or handover)
    pub preemptions: [u64; Lane::COUNT],
    /// GREEN time per lane
    pub green_time: [Duration; Lane::COUNT],
    /// YELLOW time per lane
    pub yellow_time: [Duration; Lane::COUNT],
    /// Time spent in PRIORITY mode
    pub priority_time: Duration,
    /// Gap between consecutive decisions, in milliseconds
    pub tick_interval_ms: RunningStats,
    last: Option<LastDecision>,
}

#[derive(Debug, Clone, Copy)]
struct LastDecision {
    at: Duration,
    lights: LaneLights,
    priority: bool,
}

impl DecisionStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one decision into the totals.
    pub fn update(&mut self, decision: &SignalDecision) {
        self.total_ticks += 1;
        if decision.is_priority() {
            self.priority_ticks += 1;
        }

        if let Some(last) = self.last {
            let elapsed = decision.at.saturating_sub(last.at);
            self.tick_interval_ms.push(elapsed.as_secs_f64() * 1000.0);

            if let Some((lane, state)) = last.lights.active() {
                match state {
                    LightState::Green => self.green_time[lane.index()] += elapsed,
                    LightState::Yellow => self.yellow_time[lane.index()] += elapsed,
                    LightState::Red => {}
                }
            }
            if last.priority {
                self.priority_time += elapsed;
            }
        }

        if let Some(transition) = decision.transition {
            *self.transitions.entry(transition.label()).or_insert(0) += 1;
            match transition {
                Transition::PreemptionStarted { lane } => self.preemptions[lane.index()] += 1,
                Transition::PreemptionHandover { to, .. } => self.preemptions[to.index()] += 1,
                _ => {}
            }
        }

        self.last = Some(LastDecision {
            at: decision.at,
            lights: decision.lights,
            priority: decision.is_priority(),
        });
    }

    /// Build a summary report.
    pub fn summary(&self) -> DecisionSummary {
        DecisionSummary {
            total_ticks: self.total_ticks,
            priority_ticks: self.priority_ticks,
            priority_rate: if self.total_ticks > 0 {
                self.priority_ticks as f64 / self.total_ticks as f64 * 100.0
            } else {
                0.0
            },
            priority_secs: self.priority_time.as_secs_f64(),
            transitions: self
                .transitions
                .iter()
                .map(|(label, count)| (label.to_string(), *count))
                .collect(),
            lanes: Lane::ALL
                .into_iter()
                .map(|lane| LaneSummary {
                    lane,
                    green_secs: self.green_time[lane.index()].as_secs_f64(),
                    yellow_secs: self.yellow_time[lane.index()].as_secs_f64(),
                    preemptions: self.preemptions[lane.index()],
                })
                .collect(),
            tick_interval_ms: StatsSummary::from(&self.tick_interval_ms),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Per-lane totals
#[derive(Debug, Clone, PartialEq)]
pub struct LaneSummary {
    pub lane: Lane,
    pub green_secs: f64,
    pub yellow_secs: f64,
    pub preemptions: u64,
}

/// Run summary
#[derive(Debug, Clone, Default)]
pub struct DecisionSummary {
    pub total_ticks: u64,
    pub priority_ticks: u64,
    pub priority_rate: f64,
    pub priority_secs: f64,
    pub transitions: Vec<(String, u64)>,
    pub lanes: Vec<LaneSummary>,
    pub tick_interval_ms: StatsSummary,
}

impl DecisionSummary {
    /// Preemptions over all lanes
    pub fn total_preemptions(&self) -> u64 {
        self.lanes.iter().map(|lane| lane.preemptions).sum()
    }
}

impl fmt::Display for DecisionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Signal Decision Summary ===")?;
        writeln!(f, "Total ticks: {}", self.total_ticks)?;
        writeln!(
            f,
            "Priority ticks: {} ({:.2}%, {:.2}s)",
            self.priority_ticks, self.priority_rate, self.priority_secs
        )?;
        writeln!(f, "Tick interval (ms): {}", self.tick_interval_ms)?;

        if !self.transitions.is_empty() {
            writeln!(f, "Transitions:")?;
            for (label, count) in &self.transitions {
                writeln!(f, "  {}: {}", label, count)?;
            }
        }

        writeln!(f, "Lanes:")?;
        for lane in &self.lanes {
            writeln!(
                f,
                "  {}: green={:.2}s yellow={:.2}s preemptions={}",
                lane.lane, lane.green_secs, lane.yellow_secs, lane.preemptions
            )?;
        }

        Ok(())
    }
}

/// Summary of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean / variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
