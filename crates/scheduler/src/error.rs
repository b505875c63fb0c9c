//! Scheduler error types

use contracts::ContractError;
use thiserror::Error;

/// Scheduler error
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Scheduler configuration rejected at construction
    #[error("invalid scheduler config: {0}")]
    Config(#[from] ContractError),

    /// Tick driver task panicked or was cancelled
    #[error("tick driver task failed: {0}")]
    Driver(String),
}

/// Scheduler Result type alias
pub type Result<T> = std::result::Result<T, SchedulerError>;
