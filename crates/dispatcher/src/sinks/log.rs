//! LogSink - logs batch summaries via tracing

use contracts::{ContractError, DataSink, PollBatch};
use tracing::{debug, info, instrument};

/// Sink that logs every batch, one line per item at debug level
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_batch(&self, batch: &PollBatch) {
        info!(
            sink = %self.name,
            cycle = batch.cycle,
            items = batch.len(),
            timestamp = %batch.timestamp,
            "PollBatch received"
        );
        for (name, value) in batch.values() {
            debug!(sink = %self.name, item = name, value, "sample");
        }
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, batch),
        fields(sink = %self.name, cycle = batch.cycle)
    )]
    async fn write(&mut self, batch: &PollBatch) -> Result<(), ContractError> {
        self.log_batch(batch);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log");
        assert!(sink.write(&PollBatch::new(1, Vec::new())).await.is_ok());
        assert!(sink.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }
}
