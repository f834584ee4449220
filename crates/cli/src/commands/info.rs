//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::LoggerConfig;

use crate::cli::InfoArgs;
use crate::error::ensure_config_exists;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    database: String,
    polling_threads: usize,
    cycle: CycleInfo,
    items: Vec<ItemInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct CycleInfo {
    period_ms: u64,
    settle_ms: u64,
    due_tolerance_ms: u64,
}

#[derive(Serialize)]
struct ItemInfo {
    name: String,
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    arg: Option<String>,
    interval_secs: f64,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    ensure_config_exists(&args.config)?;

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn build_config_info(config: &LoggerConfig, args: &InfoArgs) -> ConfigInfo {
    let items = config
        .items
        .iter()
        .map(|item| ItemInfo {
            name: item.name.to_string(),
            key: item.key.to_string(),
            arg: item.arg.clone(),
            interval_secs: item.interval.as_secs_f64(),
        })
        .collect();

    let sinks = if args.sinks {
        config
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", config.version),
        database: config.database.clone(),
        polling_threads: config.polling_threads,
        cycle: CycleInfo {
            period_ms: config.poller.cycle_period_ms,
            settle_ms: config.poller.settle_ms,
            due_tolerance_ms: config.poller.due_tolerance_ms,
        },
        items,
        sinks,
    }
}

fn print_config_info(config: &LoggerConfig, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Data Logger Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⚙️  Poller");
    println!("   ├─ Version: {:?}", config.version);
    println!("   ├─ Database: {}", config.database);
    println!("   ├─ Workers: {}", config.polling_threads);
    println!(
        "   └─ Cycle: {} ms (settle {} ms, tolerance {} ms)",
        config.poller.cycle_period_ms, config.poller.settle_ms, config.poller.due_tolerance_ms
    );

    println!("\n📋 Items ({})", config.items.len());
    let name_width = config
        .items
        .iter()
        .map(|item| item.name.len())
        .max()
        .unwrap_or(0);
    for (i, item) in config.items.iter().enumerate() {
        let prefix = if i == config.items.len() - 1 { "└─" } else { "├─" };
        println!(
            "   {} {:<width$}  {:<18} {:<16} {:>8.3}s",
            prefix,
            item.name.as_str(),
            item.key.to_string(),
            item.arg.as_deref().unwrap_or("-"),
            item.interval.as_secs_f64(),
            width = name_width
        );
    }

    if args.sinks && !config.sinks.is_empty() {
        println!("\n📤 Sinks ({})", config.sinks.len());
        for (i, sink) in config.sinks.iter().enumerate() {
            let prefix = if i == config.sinks.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {} {} ({:?}, queue {})",
                prefix, sink.name, sink.sink_type, sink.queue_capacity
            );
        }
    }

    println!();
}
