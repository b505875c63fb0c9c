//! DecisionSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for decision consumers.

use crate::{ContractError, SignalDecision};

/// Decision output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(DecisionSink: Send)]
pub trait LocalDecisionSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one decision
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, decision: &SignalDecision) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
