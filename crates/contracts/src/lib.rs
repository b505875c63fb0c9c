//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the controller.
//! Business crates depend only on this crate; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - All timing uses a monotonic [`Clock`]; instants are `Duration`s since the
//!   clock origin, never wall-clock time
//! - `SignalDecision::tick` orders decisions for diagnostics

mod blueprint;
mod clock;
mod decision;
mod detection;
mod detection_source;
mod error;
mod lane;
mod scheduler_config;
mod sink;

pub use blueprint::*;
pub use clock::{Clock, ManualClock, MonotonicClock, SharedClock};
pub use decision::*;
pub use detection::*;
pub use detection_source::{DetectionCallback, DetectionSource};
pub use error::*;
pub use lane::*;
pub use scheduler_config::*;
pub use sink::*;
