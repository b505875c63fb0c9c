//! SignalDecision - Scheduler output
//!
//! What the intersection shows after one tick, plus what changed.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{ControllerMode, Lane, LaneLights};

/// Change produced by a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    /// Round-robin handed GREEN to a new lane
    PhaseGreen { lane: Lane },
    /// Round-robin lane entered its YELLOW interval
    PhaseYellow { lane: Lane },
    /// Emergency override began
    PreemptionStarted { lane: Lane },
    /// The preempting lane cleared while another lane was already detected
    PreemptionHandover { from: Lane, to: Lane },
    /// Override ended; round-robin resumed on `resumed` with a fresh GREEN phase
    PreemptionCleared { resumed: Lane },
}

impl Transition {
    /// Stable label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Transition::PhaseGreen { .. } => "phase_green",
            Transition::PhaseYellow { .. } => "phase_yellow",
            Transition::PreemptionStarted { .. } => "preemption_started",
            Transition::PreemptionHandover { .. } => "preemption_handover",
            Transition::PreemptionCleared { .. } => "preemption_cleared",
        }
    }

    /// Whether the transition changes the controller mode.
    pub fn is_mode_change(&self) -> bool {
        matches!(
            self,
            Transition::PreemptionStarted { .. } | Transition::PreemptionCleared { .. }
        )
    }
}

/// Result of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalDecision {
    /// Tick counter (1-based; 0 is the initial state before any tick)
    pub tick: u64,
    /// Monotonic time the decision was taken at
    pub at: Duration,
    /// Light per lane
    pub lights: LaneLights,
    /// Controller mode
    pub mode: ControllerMode,
    /// Lane holding the override, `None` in NORMAL
    pub priority_lane: Option<Lane>,
    /// Round-robin pointer (preserved across preemption)
    pub phase_lane: Lane,
    /// What changed on this tick
    pub transition: Option<Transition>,
    /// Detection flags the decision was computed from
    pub detected: [bool; Lane::COUNT],
    /// Siren flag the decision was computed from
    pub siren: bool,
    /// Store version the decision was computed from
    pub snapshot_version: u64,
}

impl SignalDecision {
    pub fn is_priority(&self) -> bool {
        self.mode == ControllerMode::Priority
    }

    pub fn changed(&self) -> bool {
        self.transition.is_some()
    }

    pub fn at_secs(&self) -> f64 {
        self.at.as_secs_f64()
    }
}
