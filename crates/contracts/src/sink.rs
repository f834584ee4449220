//! DataSink trait - result consumer interface
//!
//! Implemented by the poller's result consumer and by every dispatcher sink.

use crate::{ContractError, PollBatch};

/// Data output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(DataSink: Send)]
pub trait LocalDataSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one cycle's result batch
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, batch: &PollBatch) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
