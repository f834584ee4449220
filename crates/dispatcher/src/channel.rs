//! ChannelSink - bounded hand-off from the poller to the dispatcher
//!
//! `write` never waits: when the queue is full the batch is dropped and
//! counted, so a slow consumer cannot stretch the poller's cycle.

use std::sync::Arc;

use contracts::{ContractError, DataSink, PollBatch};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::metrics::SinkMetrics;

/// `DataSink` that forwards batches into a bounded channel
pub struct ChannelSink {
    name: String,
    tx: mpsc::Sender<PollBatch>,
    metrics: Arc<SinkMetrics>,
}

impl ChannelSink {
    /// Create the sink and the receiving end of its queue
    pub fn new(name: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<PollBatch>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::from_sender(name, tx), rx)
    }

    pub fn from_sender(name: impl Into<String>, tx: mpsc::Sender<PollBatch>) -> Self {
        Self {
            name: name.into(),
            tx,
            metrics: Arc::new(SinkMetrics::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }
}

impl DataSink for ChannelSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, batch: &PollBatch) -> Result<(), ContractError> {
        match self.tx.try_send(batch.clone()) {
            Ok(()) => {
                self.metrics.record_write(batch.len());
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                self.metrics.inc_dropped_count();
                observability::record_batch_dropped(&self.name);
                warn!(
                    sink = %self.name,
                    cycle = dropped.cycle,
                    items = dropped.len(),
                    "Hand-off queue full, batch dropped"
                );
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.metrics.inc_failure_count();
                Err(ContractError::sink_write(&self.name, "consumer closed"))
            }
        }
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, "ChannelSink closed");
        Ok(())
    }
}
