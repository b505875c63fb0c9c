//! # Scheduler
//!
//! Emergency preemption signal scheduler.
//!
//! Responsibilities:
//! - Fixed round-robin GREEN/YELLOW cycling in NORMAL mode
//! - Immediate single-lane override (PRIORITY) when a lane reports an
//!   emergency vehicle, first-detected-wins
//! - Return to NORMAL after the post-priority buffer, resuming the
//!   interrupted lane on a fresh GREEN phase
//! - `TickDriver`: bounded-interval tick loop publishing decisions
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::{MonotonicClock, SchedulerConfig};
//! use detection_store::DetectionStore;
//! use scheduler::{SignalScheduler, TickDriver};
//!
//! let clock = MonotonicClock::shared();
//! let store = DetectionStore::shared(clock.clone());
//! let scheduler = SignalScheduler::new(SchedulerConfig::default(), store.clone(), clock)?;
//!
//! let handle = TickDriver::new(scheduler).spawn();
//! let mut decisions = handle.subscribe();
//! // ...
//! let stats = handle.shutdown().await?;
//! ```

mod driver;
mod error;
mod round_robin;
mod scheduler;

pub use driver::{DriverHandle, DriverStats, ForwardPolicy, TickDriver};
pub use error::{Result, SchedulerError};
pub use round_robin::PhaseClock;
pub use scheduler::SignalScheduler;

pub use contracts::{
    ControllerMode, LaneLights, LightState, SchedulerConfig, SignalDecision, Transition,
};
