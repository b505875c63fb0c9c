//! # Dispatcher
//!
//! Decision fan-out.
//!
//! Responsibilities:
//! - Consume `SignalDecision`s forwarded by the tick driver
//! - Fan out to multiple sinks (log, JSON Lines telemetry)
//! - Isolate slow sinks so they never stall the tick loop, shedding routine
//!   ticks before transitions when a sink falls behind

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{DecisionSink, SignalDecision};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::{Offer, SinkHandle};
pub use crate::metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{FileSink, FileSinkConfig, LogSink};
