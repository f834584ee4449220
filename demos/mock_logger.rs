//! Mock Logger Demo
//!
//! Runs the poller against the `mock` samplers and edits the item set while
//! the cycle loop is running. No hardware or network access required.
//!
//! Run with: cargo run -p demos --bin mock_logger [config.toml]

use std::time::Duration;

use config_loader::ConfigLoader;
use contracts::{ItemDefinition, LoggerConfig, SinkConfig, SinkType};
use dispatcher::{create_dispatcher, ChannelSink};
use observability::{CycleMetricsAggregator, LogFormat, ObservabilityConfig};
use poller::{Poller, PollerConfig};
use samplers::{MockSampler, SamplerRegistry, SystemSampler};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    observability::init_with_config(ObservabilityConfig {
        log_format: LogFormat::Compact,
        metrics_port: None,
        ..Default::default()
    })?;

    tracing::info!("Starting Mock Logger Demo");

    // ==== Stage 1: Use default config or load from file ====
    let config = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading logger config");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        create_demo_config()?
    };

    // ==== Stage 2: Samplers and poller ====
    let samplers = SamplerRegistry::builder()
        .register(SystemSampler::new())
        .register(MockSampler::new().with_sequence("ramp", [1.0, 2.0, 4.0, 8.0, 16.0]))
        .build();

    let poller = Poller::new(
        PollerConfig {
            stagger: false,
            ..PollerConfig::from(&config)
        },
        samplers,
    );
    for definition in &config.items {
        let item = poller.add_item(definition.clone()).await?;
        tracing::info!(item = %item.name, key = %item.key, "Item registered");
    }

    // ==== Stage 3: Dispatcher behind a tap ====
    let (handoff, mut batch_rx) = ChannelSink::new("handoff", config.poller.batch_capacity);
    let (dispatch_tx, dispatch_rx) = mpsc::channel(config.poller.batch_capacity);
    let dispatcher = create_dispatcher(config.sinks.clone(), &config.database, dispatch_rx).await?;
    let dispatcher_handle = dispatcher.spawn();

    let tap = tokio::spawn(async move {
        let mut aggregator = CycleMetricsAggregator::new();
        while let Some(batch) = batch_rx.recv().await {
            aggregator.update(&batch);
            if dispatch_tx.send(batch).await.is_err() {
                break;
            }
        }
        aggregator
    });

    // ==== Stage 4: Run, editing items on the fly ====
    let handle = poller.start(handoff)?;

    tokio::time::sleep(Duration::from_secs(3)).await;
    poller
        .add_item(ItemDefinition::parse("late counter", "mock.counter", Some("late"), 0.5)?)
        .await?;
    tracing::info!("Added 'late counter' while running");

    tokio::time::sleep(Duration::from_secs(3)).await;
    let removed = poller.delete_item("ramp").await?;
    tracing::info!(item = %removed.name, last_value = ?removed.last_value, "Removed item");

    for item in poller.list_items().await? {
        tracing::info!(item = %item.name, last_value = ?item.last_value, "Current item");
    }

    tokio::time::sleep(Duration::from_secs(2)).await;

    // ==== Stage 5: Shutdown ====
    let stats = handle.shutdown().await?;
    let aggregator = tap.await?;
    let _ = tokio::time::timeout(Duration::from_secs(2), dispatcher_handle).await;

    tracing::info!(?stats, "Poller stopped");
    println!("{}", aggregator.summary());

    Ok(())
}

/// Built-in demo: a few mock items and a log sink
fn create_demo_config() -> Result<LoggerConfig, contracts::ContractError> {
    Ok(LoggerConfig {
        polling_threads: 2,
        items: vec![
            ItemDefinition::parse("counter", "mock.counter", None, 1.0)?,
            ItemDefinition::parse("ramp", "mock.sequence", Some("ramp"), 1.0)?,
            ItemDefinition::parse("setpoint", "mock.constant", Some("21.5"), 2.0)?,
            ItemDefinition::parse("broken", "mock.fail", None, 1.0)?,
            ItemDefinition::parse("load", "system.loadavg1", None, 5.0)?,
        ],
        sinks: vec![SinkConfig {
            name: "console".to_string(),
            sink_type: SinkType::Log,
            queue_capacity: 16,
            params: Default::default(),
        }],
        ..LoggerConfig::default()
    })
}
