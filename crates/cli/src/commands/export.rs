//! `export` command implementation.
//!
//! Loads the configured items into a poller that is never started and
//! rebuilds the item list from the poller's registry.

use anyhow::{Context, Result};
use contracts::LoggerConfig;
use poller::{Poller, PollerConfig};
use samplers::SamplerRegistry;
use tracing::info;

use crate::cli::ExportArgs;
use crate::error::ensure_config_exists;

/// Execute the `export` command
pub async fn run_export(args: &ExportArgs) -> Result<()> {
    info!(config = %args.config.display(), format = ?args.format, "Exporting configuration");

    ensure_config_exists(&args.config)?;

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let exported = export_config(config).await?;
    let content = config_loader::ConfigLoader::serialize(&exported, args.format.into())
        .context("Failed to serialize configuration")?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), items = exported.items.len(), "Configuration exported");
        }
        None => print!("{}", content),
    }

    Ok(())
}

/// Replace `config.items` with what a poller actually holds after loading
async fn export_config(config: LoggerConfig) -> Result<LoggerConfig> {
    let poller = Poller::new(PollerConfig::from(&config), SamplerRegistry::with_defaults());

    for definition in &config.items {
        poller
            .add_item(definition.clone())
            .await
            .with_context(|| format!("Failed to register poll item '{}'", definition.name))?;
    }

    let items = poller
        .item_definitions()
        .await
        .context("Failed to read item definitions")?;

    Ok(LoggerConfig { items, ..config })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ExportFormat;
    use config_loader::{ConfigFormat, ConfigLoader};
    use poller::PollerError;
    use tempfile::tempdir;

    const CONFIG: &str = r#"
database = "lab"

[[items]]
name = "load"
key = "system.loadavg1"
interval = 1.0

[[items]]
name = "ping gw"
key = "net.ping"
arg = "10.0.0.1"
interval = 5.0
"#;

    #[tokio::test]
    async fn test_export_round_trip() {
        let config = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let exported = export_config(config).await.unwrap();

        assert_eq!(exported.items.len(), 2);
        assert_eq!(exported.items[0].name, "load");
        assert_eq!(exported.items[0].key.to_string(), "system.loadavg1");
        assert_eq!(exported.items[1].arg.as_deref(), Some("10.0.0.1"));
        assert_eq!(exported.database, "lab");

        let toml = ConfigLoader::to_toml(&exported).unwrap();
        let reloaded = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(reloaded.items, exported.items);
    }

    #[tokio::test]
    async fn test_duplicate_item_fails_export() {
        let content = format!(
            "{CONFIG}\n[[items]]\nname = \"load\"\nkey = \"system.loadavg5\"\ninterval = 5.0\n"
        );
        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();

        let err = export_config(config).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PollerError>(),
            Some(PollerError::ItemExists { name }) if name == "load"
        ));
    }

    #[tokio::test]
    async fn test_run_export_writes_json_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("data_logger.toml");
        let output = dir.path().join("exported.json");
        std::fs::write(&config_path, CONFIG).unwrap();

        let args = ExportArgs {
            config: config_path,
            format: ExportFormat::Json,
            output: Some(output.clone()),
        };
        run_export(&args).await.unwrap();

        let reloaded = ConfigLoader::load_from_path(&output).unwrap();
        assert_eq!(reloaded.items.len(), 2);
        assert_eq!(reloaded.items[1].name, "ping gw");
    }
}
