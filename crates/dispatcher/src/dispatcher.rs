//! Dispatcher - main loop for fan-out to sinks

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{PollBatch, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink, NetworkSink, DEFAULT_MEASUREMENT};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Sink configurations
    pub sinks: Vec<SinkConfig>,
    /// Line-protocol measurement for sinks that don't set their own
    pub measurement: String,
}

impl DispatcherConfig {
    pub fn new(sinks: Vec<SinkConfig>) -> Self {
        Self {
            sinks,
            measurement: DEFAULT_MEASUREMENT.to_string(),
        }
    }

    pub fn with_measurement(mut self, measurement: impl Into<String>) -> Self {
        self.measurement = measurement.into();
        self
    }
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: mpsc::Receiver<PollBatch>,
}

impl DispatcherBuilder {
    pub fn new(config: DispatcherConfig, input_rx: mpsc::Receiver<PollBatch>) -> Self {
        Self { config, input_rx }
    }

    /// Create every sink and spawn its worker
    #[instrument(name = "dispatcher_builder_build", skip(self), fields(sink_count = self.config.sinks.len()))]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let mut names = HashSet::new();
        let mut handles = Vec::with_capacity(self.config.sinks.len());

        for sink_config in &self.config.sinks {
            if !names.insert(sink_config.name.as_str()) {
                return Err(DispatcherError::DuplicateSink {
                    name: sink_config.name.clone(),
                });
            }
            handles.push(create_sink_handle(sink_config, &self.config.measurement).await?);
        }

        Ok(Dispatcher {
            handles,
            input_rx: self.input_rx,
        })
    }
}

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config, measurement),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
async fn create_sink_handle(config: &SinkConfig, measurement: &str) -> Result<SinkHandle, DispatcherError> {
    let mut params = config.params.clone();
    params
        .entry("measurement".to_string())
        .or_insert_with(|| measurement.to_string());

    match config.sink_type {
        SinkType::Log => Ok(SinkHandle::spawn(LogSink::new(&config.name), config.queue_capacity)),
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(&config.name, &params)
                .await
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// Fans batches out to every sink
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<PollBatch>,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles (for testing)
    pub fn with_handles(handles: Vec<SinkHandle>, input_rx: mpsc::Receiver<PollBatch>) -> Self {
        Self { handles, input_rx }
    }

    pub fn sink_count(&self) -> usize {
        self.handles.len()
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Run until the input channel closes, then drain and close every sink
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> Vec<(String, MetricsSnapshot)> {
        info!(sinks = self.handles.len(), "Dispatcher started");

        let mut batch_count: u64 = 0;
        while let Some(batch) = self.input_rx.recv().await {
            batch_count += 1;
            let batch = Arc::new(batch);
            for handle in &self.handles {
                handle.try_send(Arc::clone(&batch));
            }

            if batch_count.is_multiple_of(60) {
                debug!(batches = batch_count, "Dispatcher progress");
            }
        }

        info!(batches = batch_count, "Dispatcher input closed, shutting down");

        let metrics = self.metrics();
        for handle in self.handles {
            handle.shutdown().await;
        }

        info!("Dispatcher shutdown complete");
        metrics
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<Vec<(String, MetricsSnapshot)>> {
        tokio::spawn(self.run())
    }
}

/// Convenience function to create a dispatcher from sink configs
#[instrument(name = "dispatcher_create", skip(sink_configs, input_rx))]
pub async fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    measurement: &str,
    input_rx: mpsc::Receiver<PollBatch>,
) -> Result<Dispatcher, DispatcherError> {
    let config = DispatcherConfig::new(sink_configs).with_measurement(measurement);
    DispatcherBuilder::new(config, input_rx).build().await
}
