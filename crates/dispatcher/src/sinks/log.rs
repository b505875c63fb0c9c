//! LogSink - logs decision summaries via tracing

use contracts::{ContractError, DecisionSink, SignalDecision};
use tracing::{info, instrument, trace};

/// Sink that logs decisions: transitions at info, steady ticks at trace
pub struct LogSink {
    name: String,
    logged: u64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logged: 0,
        }
    }

    fn log_decision(&self, decision: &SignalDecision) {
        let active = decision
            .lights
            .active()
            .map(|(lane, state)| format!("{lane}={state:?}"))
            .unwrap_or_else(|| "all red".to_string());

        match decision.transition {
            Some(transition) => info!(
                sink = %self.name,
                tick = decision.tick,
                t = decision.at_secs(),
                mode = %decision.mode,
                priority_lane = ?decision.priority_lane,
                active = %active,
                transition = transition.label(),
                "signal change"
            ),
            None => trace!(
                sink = %self.name,
                tick = decision.tick,
                mode = %decision.mode,
                active = %active,
                "signal steady"
            ),
        }
    }
}

impl DecisionSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, decision),
        fields(sink = %self.name, tick = decision.tick)
    )]
    async fn write(&mut self, decision: &SignalDecision) -> Result<(), ContractError> {
        self.log_decision(decision);
        self.logged += 1;
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, decisions = self.logged, "LogSink closed");
        Ok(())
    }
}
