//! Pipeline orchestrator - coordinates all components.
//!
//! Poller -> hand-off channel -> tap (stats, cycle limit) -> dispatcher -> sinks.

use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{LoggerConfig, PollBatch};
use dispatcher::ChannelSink;
use poller::{Poller, PollerConfig};
use samplers::SamplerRegistry;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Name of the sink the poller writes to
const HANDOFF_SINK: &str = "handoff";

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The loaded logger configuration
    pub config: LoggerConfig,

    /// Stop after this many cycles (None = until shutdown)
    pub max_cycles: Option<u64>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves or the cycle limit is reached
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let config = &self.config.config;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Samplers and poller
        let samplers = SamplerRegistry::with_defaults();
        info!(namespaces = ?samplers.namespaces(), "Samplers registered");

        let poller_config = PollerConfig::from(config);
        let cycle_period = poller_config.cycle_period;
        let poller = Poller::new(poller_config, samplers);

        let mut stats = PipelineStats {
            active_sinks: config.sinks.len(),
            ..Default::default()
        };

        // 按文件顺序注册，重名条目直接让加载失败
        for definition in &config.items {
            poller
                .add_item(definition.clone())
                .await
                .with_context(|| format!("Failed to register poll item '{}'", definition.name))?;
            stats.items_loaded += 1;
        }

        info!(items = stats.items_loaded, "Poll items registered");

        // Setup Dispatcher
        info!("Setting up dispatcher...");
        if config.sinks.is_empty() {
            warn!("No sinks configured - batches will be dropped");
        }

        let (dispatch_tx, dispatch_rx) = mpsc::channel::<PollBatch>(config.poller.batch_capacity);
        let dispatcher = dispatcher::create_dispatcher(config.sinks.clone(), &config.database, dispatch_rx)
            .await
            .context("Failed to create dispatcher")?;
        let dispatcher_handle = dispatcher.spawn();

        // Start Poller
        let (handoff, mut batch_rx) = ChannelSink::new(HANDOFF_SINK, config.poller.batch_capacity);
        let handoff_metrics = std::sync::Arc::clone(handoff.metrics());
        let poller_handle = poller.start(handoff).context("Failed to start poller")?;

        info!(max_cycles = ?self.config.max_cycles, "Poller running");

        // 每个周期检查一次周期上限，空周期不产生批次
        let mut ticker = tokio::time::interval(cycle_period);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                batch = batch_rx.recv() => {
                    let Some(batch) = batch else {
                        warn!("Poller hand-off closed");
                        break;
                    };
                    stats.batches += 1;
                    stats.samples += batch.len() as u64;
                    stats.metrics.update(&batch);

                    info!(
                        cycle = batch.cycle,
                        items = batch.len(),
                        "Batch produced"
                    );

                    if dispatch_tx.send(batch).await.is_err() {
                        warn!("Dispatcher channel closed");
                        break;
                    }
                }
                _ = ticker.tick() => {}
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping poller...");
                    break;
                }
            }

            if let Some(max) = self.config.max_cycles {
                if poller_handle.stats().cycles >= max {
                    info!(cycles = max, "Reached cycle limit");
                    break;
                }
            }
        }

        // Shutdown
        info!("Shutting down pipeline...");
        stats.poller = poller_handle
            .shutdown()
            .await
            .map_err(|e| CliError::shutdown(e.to_string()))?;
        stats.handoff_dropped = handoff_metrics.dropped_count();

        // Forward anything harvested during the last cycle
        while let Ok(batch) = batch_rx.try_recv() {
            stats.batches += 1;
            stats.samples += batch.len() as u64;
            stats.metrics.update(&batch);
            if dispatch_tx.send(batch).await.is_err() {
                break;
            }
        }
        drop(dispatch_tx);

        // Wait for dispatcher to flush
        match tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await {
            Ok(Ok(sink_metrics)) => stats.sink_metrics = sink_metrics,
            Ok(Err(e)) => warn!(error = %e, "Dispatcher task failed"),
            Err(_) => warn!("Dispatcher did not finish flushing within 5s"),
        }

        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            cycles = stats.poller.cycles,
            batches = stats.batches,
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ItemDefinition;
    use poller::PollerError;

    fn item(name: &str, key: &str) -> ItemDefinition {
        ItemDefinition::parse(name, key, None, 0.05).unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_item_fails_load() {
        let config = LoggerConfig {
            items: vec![item("a", "mock.counter"), item("a", "mock.constant")],
            ..LoggerConfig::default()
        };
        let pipeline = Pipeline::new(PipelineConfig {
            config,
            max_cycles: Some(1),
            metrics_port: None,
        });

        let err = pipeline.run(std::future::pending()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PollerError>(),
            Some(PollerError::ItemExists { name }) if name == "a"
        ));
    }

    #[tokio::test]
    async fn test_runs_to_cycle_limit() {
        let mut config = LoggerConfig {
            items: vec![item("counter", "mock.counter")],
            ..LoggerConfig::default()
        };
        config.poller.cycle_period_ms = 50;
        config.poller.settle_ms = 10;

        let stats = Pipeline::new(PipelineConfig {
            config,
            max_cycles: Some(3),
            metrics_port: None,
        })
        .run(std::future::pending())
        .await
        .unwrap();

        assert_eq!(stats.items_loaded, 1);
        assert!(stats.poller.cycles >= 3);
    }
}
