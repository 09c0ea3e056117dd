//! `info` command implementation.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use config_loader::{client_properties, resolve_pool_config};
use contracts::{PoolConfig, PublisherBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    pool: PoolConfig,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    global: HashMap<String, String>,
    adapters: Vec<AdapterInfo>,
}

#[derive(Serialize)]
struct AdapterInfo {
    name: String,
    tenant: String,
    client: String,
    broker_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    properties: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped_properties: Vec<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let info = build_config_info(&blueprint, args)?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &PublisherBlueprint, args: &InfoArgs) -> Result<ConfigInfo> {
    let pool = resolve_pool_config(&blueprint.global).context("Invalid pool overrides")?;

    let adapters = blueprint
        .adapters
        .iter()
        .map(|adapter| {
            let (properties, skipped) = client_properties(
                &adapter.broker_address,
                adapter.optional_properties.as_deref(),
            );
            AdapterInfo {
                name: adapter.name.clone(),
                tenant: adapter.tenant.clone(),
                client: format!("{:?}", adapter.client),
                broker_address: adapter.broker_address.clone(),
                properties: args.properties.then(|| {
                    properties
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect()
                }),
                skipped_properties: skipped,
            }
        })
        .collect();

    Ok(ConfigInfo {
        version: format!("{:?}", blueprint.version),
        pool,
        global: blueprint.global.clone(),
        adapters,
    })
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Event Publisher Configuration                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⚙️  Dispatch Pool");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Min workers: {}", info.pool.min_workers);
    println!("   ├─ Max workers: {}", info.pool.max_workers);
    println!("   ├─ Keep-alive: {} ms", info.pool.keep_alive_ms);
    println!("   └─ Backlog capacity: {}", info.pool.backlog_capacity);

    println!("\n📤 Adapters ({})", info.adapters.len());
    for (i, adapter) in info.adapters.iter().enumerate() {
        let is_last = i == info.adapters.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} ({}, tenant {}) → {}",
            prefix, adapter.name, adapter.client, adapter.tenant, adapter.broker_address
        );

        if let Some(ref properties) = adapter.properties {
            for (j, (key, value)) in properties.iter().enumerate() {
                let property_prefix = if j == properties.len() - 1 { "└─" } else { "├─" };
                println!("   {}  {} {} = {}", child_prefix, property_prefix, key, value);
            }
        }

        for entry in &adapter.skipped_properties {
            println!("   {}  ⚠ skipped '{}'", child_prefix, entry);
        }
    }

    println!();
}
