//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    database: String,
    polling_threads: usize,
    item_count: usize,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    match result.error {
        None => Ok(()),
        Some(message) => Err(CliError::config_validation(message).into()),
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    database: config.database.clone(),
                    polling_threads: config.polling_threads,
                    item_count: config.items.len(),
                    sink_count: config.sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &contracts::LoggerConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.sinks.is_empty() {
        warnings.push("No sinks configured - batches will be dropped".to_string());
    }

    if config.items.is_empty() {
        warnings.push("No items configured - every cycle will be empty".to_string());
    }

    // add_item refuses the second copy, so `run` and `export` stop there
    let mut seen = std::collections::HashSet::new();
    for item in &config.items {
        if !seen.insert(item.name.as_str()) {
            warnings.push(format!("Duplicate item name '{}': loading will fail with ItemExists", item.name));
        }
    }

    let cycle = std::time::Duration::from_millis(config.poller.cycle_period_ms);
    for item in &config.items {
        if item.interval < cycle {
            warnings.push(format!(
                "Item '{}' interval {:.3}s is shorter than the cycle period; it is sampled at most once per cycle",
                item.name,
                item.interval.as_secs_f64()
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Database: {}", summary.database);
            println!("  Workers: {}", summary.polling_threads);
            println!("  Items: {}", summary.item_count);
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ItemDefinition, LoggerConfig};

    #[test]
    fn test_warnings_for_empty_config() {
        let warnings = collect_warnings(&LoggerConfig::default());
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_warns_on_duplicates_and_fast_items() {
        let config = LoggerConfig {
            items: vec![
                ItemDefinition::parse("a", "mock.counter", None, 1.0).unwrap(),
                ItemDefinition::parse("a", "mock.counter", None, 0.2).unwrap(),
            ],
            ..LoggerConfig::default()
        };

        let warnings = collect_warnings(&config);
        assert!(warnings.iter().any(|w| w.contains("Duplicate item name 'a'")));
        assert!(warnings.iter().any(|w| w.contains("0.200s")));
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let args = ValidateArgs {
            config: "/nonexistent/data_logger.toml".into(),
            json: true,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }
}
