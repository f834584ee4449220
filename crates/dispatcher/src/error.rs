//! Dispatcher error types

use thiserror::Error;

/// Errors raised while building the sink fan-out
///
/// Once running, sink failures are counted per sink and never surface here.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Two sinks share a name
    #[error("duplicate sink name '{name}'")]
    DuplicateSink { name: String },
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
