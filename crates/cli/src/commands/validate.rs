//! `validate` command implementation.

use anyhow::{Context, Result};
use config_loader::{
    parse_optional_properties, resolve_pool_config, BACKLOG_CAPACITY_KEY, KEEP_ALIVE_MS_KEY,
    MAX_WORKERS_KEY, MIN_WORKERS_KEY,
};
use contracts::{PoolConfig, PublisherBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

const POOL_KEYS: [&str; 4] = [
    MIN_WORKERS_KEY,
    MAX_WORKERS_KEY,
    KEEP_ALIVE_MS_KEY,
    BACKLOG_CAPACITY_KEY,
];

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
    adapter_count: usize,
    adapters: Vec<String>,
    pool: PoolConfig,
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

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
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

    // Loading already validates, including the pool overrides
    let loaded = config_loader::ConfigLoader::load_from_path(&args.config).and_then(|blueprint| {
        let pool = resolve_pool_config(&blueprint.global)?;
        Ok((blueprint, pool))
    });

    match loaded {
        Ok((blueprint, pool)) => {
            let warnings = collect_warnings(&blueprint, &pool);

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
                    version: format!("{:?}", blueprint.version),
                    adapter_count: blueprint.adapters.len(),
                    adapters: blueprint.adapters.iter().map(|a| a.name.clone()).collect(),
                    pool,
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
fn collect_warnings(blueprint: &PublisherBlueprint, pool: &PoolConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    let mut unknown: Vec<&str> = blueprint
        .global
        .keys()
        .map(String::as_str)
        .filter(|key| !POOL_KEYS.contains(key))
        .collect();
    unknown.sort_unstable();
    for key in unknown {
        warnings.push(format!("Global property '{}' is not recognized and will be ignored", key));
    }

    if pool.min_workers == 0 {
        warnings.push(
            "min_workers is 0 - workers start on demand and none stay alive when idle"
                .to_string(),
        );
    }

    for adapter in &blueprint.adapters {
        let parsed = parse_optional_properties(adapter.optional_properties.as_deref());
        for entry in parsed.malformed {
            warnings.push(format!(
                "Adapter '{}': optional property '{}' is not in 'key=value' form and will be skipped",
                adapter.name, entry
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
            println!(
                "  Adapters ({}): {}",
                summary.adapter_count,
                summary.adapters.join(", ")
            );
            println!(
                "  Pool: min={} max={} keep_alive={}ms backlog={}",
                summary.pool.min_workers,
                summary.pool.max_workers,
                summary.pool.keep_alive_ms,
                summary.pool.backlog_capacity
            );
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
