//! ControllerBlueprint - Config Loader output
//!
//! Describes one intersection controller: identity, signal timing, and the
//! sinks that receive decisions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::SchedulerConfig;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Intersection identity
    #[serde(default)]
    pub intersection: IntersectionConfig,

    /// Signal timing and preemption policy
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Decision consumers
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// Intersection identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntersectionConfig {
    /// Name used in logs and telemetry
    #[serde(default = "default_intersection_name")]
    pub name: String,
}

impl Default for IntersectionConfig {
    fn default() -> Self {
        Self {
            name: default_intersection_name(),
        }
    }
}

fn default_intersection_name() -> String {
    "intersection".to_string()
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Sink-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Tracing summary per decision
    Log,
    /// JSON Lines telemetry file
    File,
}

impl Default for ControllerBlueprint {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            intersection: IntersectionConfig::default(),
            scheduler: SchedulerConfig::default(),
            sinks: Vec::new(),
        }
    }
}
