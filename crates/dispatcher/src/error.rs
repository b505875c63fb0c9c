//! Dispatcher error types

use contracts::SinkType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatcherError {
    /// A configured sink could not be opened
    #[error("cannot open {sink_type:?} sink '{name}': {source}")]
    SinkCreation {
        name: String,
        sink_type: SinkType,
        #[source]
        source: std::io::Error,
    },

    /// Two sinks share a name, which would merge their metrics
    #[error("sink name '{name}' is used more than once")]
    DuplicateSink { name: String },
}
