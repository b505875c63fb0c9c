//! Detection facts written by sensor adapters and read by the scheduler.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Lane;

/// Which detector produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Per-lane vehicle detector
    Vision,
    /// Global siren detector
    Audio,
}

impl SensorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SensorKind::Vision => "vision",
            SensorKind::Audio => "audio",
        }
    }
}

/// A single detection update, as produced by a [`crate::DetectionSource`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectionReport {
    /// Emergency vehicle present (or not) on one lane
    Lane {
        lane: Lane,
        detected: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confidence: Option<f32>,
    },
    /// Siren audible (or not) anywhere around the intersection
    Siren { detected: bool },
}

impl DetectionReport {
    pub fn lane(lane: Lane, detected: bool) -> Self {
        Self::Lane {
            lane,
            detected,
            confidence: None,
        }
    }

    pub fn siren(detected: bool) -> Self {
        Self::Siren { detected }
    }

    pub fn sensor_kind(&self) -> SensorKind {
        match self {
            Self::Lane { .. } => SensorKind::Vision,
            Self::Siren { .. } => SensorKind::Audio,
        }
    }

    /// Whether this report asserts an emergency.
    pub fn is_positive(&self) -> bool {
        match *self {
            Self::Lane { detected, .. } | Self::Siren { detected } => detected,
        }
    }
}

/// Point-in-time copy of every detection field.
///
/// The default value (nothing detected, no emergency ever seen) is the safe
/// fallback used when the store cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionSnapshot {
    /// Per-lane detection flags, indexed by [`Lane::index`]
    pub lanes: [bool; Lane::COUNT],
    /// Per-lane detector confidence, present only while detected
    pub confidence: [Option<f32>; Lane::COUNT],
    /// Siren audible
    pub siren: bool,
    /// Monotonic time of the most recent positive detection from any sensor
    pub last_emergency: Option<Duration>,
    /// Number of writes committed to the store when this copy was taken
    pub version: u64,
}

impl DetectionSnapshot {
    #[inline]
    pub fn lane_detected(&self, lane: Lane) -> bool {
        self.lanes[lane.index()]
    }

    pub fn confidence(&self, lane: Lane) -> Option<f32> {
        self.confidence[lane.index()]
    }

    /// First lane in `order` reporting a detection.
    pub fn first_detected(&self, order: &[Lane]) -> Option<Lane> {
        order.iter().copied().find(|lane| self.lane_detected(*lane))
    }

    pub fn any_lane_detected(&self) -> bool {
        self.lanes.iter().any(|detected| *detected)
    }

    /// Lanes currently reporting a detection, in round-robin order.
    pub fn detected_lanes(&self) -> impl Iterator<Item = Lane> + '_ {
        Lane::ALL
            .into_iter()
            .filter(move |lane| self.lane_detected(*lane))
    }

    /// Time elapsed between the last emergency signal and `now`.
    ///
    /// `None` when no emergency has ever been recorded.
    pub fn since_last_emergency(&self, now: Duration) -> Option<Duration> {
        self.last_emergency.map(|at| now.saturating_sub(at))
    }
}
