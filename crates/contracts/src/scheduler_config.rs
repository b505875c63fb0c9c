//! Scheduler configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{ContractError, Lane};

/// Recommended upper bound for the tick interval; larger values delay preemption.
pub const RECOMMENDED_MAX_TICK_MS: u64 = 50;

/// Upper bound for any timing value in seconds (one day).
pub const MAX_TIMING_S: f64 = 86_400.0;

/// Signal timing and preemption policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// GREEN duration per lane in NORMAL mode (seconds)
    #[serde(default = "default_green_time")]
    pub green_time_s: f64,

    /// YELLOW duration per lane in NORMAL mode (seconds)
    #[serde(default = "default_yellow_time")]
    pub yellow_time_s: f64,

    /// Quiet time required after the last emergency signal before NORMAL resumes (seconds)
    #[serde(default)]
    pub post_priority_buffer_s: f64,

    /// Tie-break order when several lanes report a detection in the same tick
    #[serde(default = "default_priority_order")]
    pub priority_order: Vec<Lane>,

    /// Tick driver interval (milliseconds)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_green_time() -> f64 {
    6.0
}

fn default_yellow_time() -> f64 {
    1.0
}

fn default_priority_order() -> Vec<Lane> {
    Lane::ALL.to_vec()
}

fn default_tick_interval_ms() -> u64 {
    RECOMMENDED_MAX_TICK_MS
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            green_time_s: default_green_time(),
            yellow_time_s: default_yellow_time(),
            post_priority_buffer_s: 0.0,
            priority_order: default_priority_order(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl SchedulerConfig {
    pub fn green_time(&self) -> Duration {
        seconds(self.green_time_s)
    }

    pub fn yellow_time(&self) -> Duration {
        seconds(self.yellow_time_s)
    }

    pub fn post_priority_buffer(&self) -> Duration {
        seconds(self.post_priority_buffer_s)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Length of one lane's GREEN + YELLOW phase.
    pub fn phase_length(&self) -> Duration {
        self.green_time().saturating_add(self.yellow_time())
    }

    /// Length of a full round-robin cycle over all lanes.
    pub fn cycle_length(&self) -> Duration {
        self.phase_length()
            .checked_mul(Lane::COUNT as u32)
            .unwrap_or(Duration::MAX)
    }

    /// Check the values a scheduler can run with.
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), ContractError> {
        if !self.green_time_s.is_finite() || self.green_time_s <= 0.0 {
            return Err(ContractError::config_validation(
                "scheduler.green_time_s",
                format!("green_time_s must be > 0, got {}", self.green_time_s),
            ));
        }

        let timings = [
            ("green_time_s", self.green_time_s),
            ("yellow_time_s", self.yellow_time_s),
            ("post_priority_buffer_s", self.post_priority_buffer_s),
        ];
        for (name, value) in timings {
            if !value.is_finite() || value < 0.0 {
                return Err(ContractError::config_validation(
                    format!("scheduler.{name}"),
                    format!("{name} must be >= 0, got {value}"),
                ));
            }
            if value > MAX_TIMING_S {
                return Err(ContractError::config_validation(
                    format!("scheduler.{name}"),
                    format!("{name} must be <= {MAX_TIMING_S}, got {value}"),
                ));
            }
        }

        if self.tick_interval_ms == 0 {
            return Err(ContractError::config_validation(
                "scheduler.tick_interval_ms",
                "tick_interval_ms must be > 0",
            ));
        }

        let mut seen = [false; Lane::COUNT];
        for lane in &self.priority_order {
            if std::mem::replace(&mut seen[lane.index()], true) {
                return Err(ContractError::config_validation(
                    "scheduler.priority_order",
                    format!("duplicate lane '{}' in priority_order", lane),
                ));
            }
        }
        if let Some(missing) = Lane::ALL.into_iter().find(|lane| !seen[lane.index()]) {
            return Err(ContractError::config_validation(
                "scheduler.priority_order",
                format!("priority_order must list every lane, missing '{}'", missing),
            ));
        }

        Ok(())
    }
}

/// Seconds to `Duration`, clamped to `[0, MAX_TIMING_S]`; NaN maps to zero.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.clamp(0.0, MAX_TIMING_S)).unwrap_or(Duration::ZERO)
}
