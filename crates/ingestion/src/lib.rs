//! # Ingestion
//!
//! Detection source registration and playback.
//!
//! Responsibilities:
//! - Register `DetectionSource`s (camera/audio adapters, recordings)
//! - Apply every report they emit to the shared `DetectionStore`
//! - Replay recorded detection timelines from JSON Lines files
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::{MonotonicClock, SensorKind};
//! use detection_store::DetectionStore;
//! use ingestion::{ReplayConfig, ReplaySource, SourceRegistry};
//!
//! let store = DetectionStore::shared(MonotonicClock::shared());
//! let mut registry = SourceRegistry::new(store.clone());
//!
//! let camera = ReplaySource::load("run.jsonl", "camera", SensorKind::Vision, ReplayConfig::default())?;
//! registry.register(Box::new(camera))?;
//! registry.start_all();
//! ```

mod error;
mod metrics;
mod registry;
mod replay;

pub use contracts::{DetectionReport, DetectionSource, SensorKind};
pub use error::{IngestionError, Result};
pub use crate::metrics::{IngestionMetrics, MetricsSnapshot};
pub use registry::SourceRegistry;
pub use replay::{ReplayConfig, ReplaySource, TimedReport};
