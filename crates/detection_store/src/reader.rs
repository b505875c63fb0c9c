//! Read side of the store.

use std::fmt;

use contracts::DetectionSnapshot;

use crate::error::Result;
use crate::store::DetectionStore;

/// Source of detection snapshots for the scheduler.
pub trait DetectionReader: Send + Sync + fmt::Debug {
    /// Consistent copy of every detection field.
    ///
    /// # Errors
    /// Returns an error if the underlying state cannot be read.
    fn snapshot(&self) -> Result<DetectionSnapshot>;
}

impl DetectionReader for DetectionStore {
    fn snapshot(&self) -> Result<DetectionSnapshot> {
        DetectionStore::snapshot(self)
    }
}
