//! Detection store error types

use thiserror::Error;

/// Detection store error
#[derive(Debug, Error)]
pub enum StoreError {
    /// A writer panicked while holding the store lock
    #[error("detection store poisoned by a panicking writer")]
    Poisoned,
}

/// Detection store Result type alias
pub type Result<T> = std::result::Result<T, StoreError>;
