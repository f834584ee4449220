//! `run` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::RunArgs;
use crate::error::ensure_config_exists;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    ensure_config_exists(&args.config)?;

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(workers) = args.workers {
        info!(workers, "Overriding polling_threads from CLI");
        config.polling_threads = workers;
        config_loader::ConfigLoader::validate(&config).context("Invalid --workers override")?;
    }

    info!(
        items = config.items.len(),
        workers = config.polling_threads,
        cycle_period_ms = config.poller.cycle_period_ms,
        sinks = config.sinks.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        config,
        max_cycles: (args.cycles > 0).then_some(args.cycles),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    info!("Starting poller...");

    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        cycles = stats.poller.cycles,
        batches = stats.batches,
        samples = stats.samples,
        duration_secs = stats.duration.as_secs_f64(),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("Data Logger finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &contracts::LoggerConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Database: {}", config.database);
    println!("Workers: {}", config.polling_threads);
    println!(
        "Cycle: {} ms (settle {} ms, tolerance {} ms)",
        config.poller.cycle_period_ms, config.poller.settle_ms, config.poller.due_tolerance_ms
    );

    println!("\nItems ({}):", config.items.len());
    for item in &config.items {
        println!("  - {} every {:.3}s", item, item.interval.as_secs_f64());
    }

    if !config.sinks.is_empty() {
        println!("\nSinks ({}):", config.sinks.len());
        for sink in &config.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
