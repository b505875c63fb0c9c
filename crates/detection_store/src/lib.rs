//! # Detection Store
//!
//! Latest detection facts for the intersection.
//!
//! Responsibilities:
//! - Accept per-lane vision updates and global siren updates from any thread
//! - Stamp the monotonic time of the most recent emergency signal
//! - Hand out consistent point-in-time `DetectionSnapshot`s to the scheduler
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::{Lane, MonotonicClock};
//! use detection_store::DetectionStore;
//!
//! let store = DetectionStore::shared(MonotonicClock::shared());
//!
//! // camera adapter thread
//! store.set_lane_detected(Lane::South, true);
//!
//! // scheduler tick
//! let snapshot = store.snapshot()?;
//! ```

mod error;
mod reader;
mod store;

pub use contracts::{DetectionReport, DetectionSnapshot};
pub use error::{Result, StoreError};
pub use reader::DetectionReader;
pub use store::{DetectionStore, StoreStats, StoreStatsSnapshot};
