//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::RelayConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    broker: BrokerInfo,
    rules: Vec<RuleInfo>,
    provider: ProviderInfo,
    registry: String,
    ingress: String,
}

#[derive(Serialize)]
struct BrokerInfo {
    host: String,
    port: u16,
    tls: bool,
    client_id: String,
    authenticated: bool,
    topics: Vec<String>,
    max_retries: Option<u32>,
}

#[derive(Serialize)]
struct RuleInfo {
    name: String,
    field: String,
    threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<String>,
}

#[derive(Serialize)]
struct ProviderInfo {
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    batch_size: usize,
    batch_timeout_ms: u64,
    max_concurrent_batches: usize,
    prune_invalid: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

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

fn registry_description(config: &RelayConfig) -> String {
    config
        .registry
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "in-memory".to_string())
}

fn build_config_info(config: &RelayConfig, args: &InfoArgs) -> ConfigInfo {
    let broker = &config.broker;
    let provider = &config.provider;

    let rules = config
        .rules
        .iter()
        .map(|r| RuleInfo {
            name: r.name.clone(),
            field: r.field.clone(),
            threshold: r.threshold,
            topic: r.topic.clone(),
            title: args.templates.then(|| r.title.clone()),
            body: args.templates.then(|| r.body.clone()),
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", config.version),
        broker: BrokerInfo {
            host: broker.host.clone(),
            port: broker.port,
            tls: broker.tls,
            client_id: broker.client_id.clone(),
            authenticated: broker.username.is_some(),
            topics: broker.topics.clone(),
            max_retries: broker.reconnect.max_retries,
        },
        rules,
        provider: ProviderInfo {
            kind: format!("{:?}", provider.kind),
            project_id: provider.project_id.clone(),
            endpoint: provider.endpoint.clone(),
            batch_size: provider.batch_size,
            batch_timeout_ms: provider.batch_timeout_ms,
            max_concurrent_batches: provider.max_concurrent_batches,
            prune_invalid: provider.prune_invalid,
        },
        registry: registry_description(config),
        ingress: config.ingress.bind.clone(),
    }
}

fn print_config_info(config: &RelayConfig, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Push Relay Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let broker = &config.broker;
    println!("📡 Broker");
    println!("   ├─ Version: {:?}", config.version);
    println!("   ├─ Address: {}:{}", broker.host, broker.port);
    println!(
        "   ├─ TLS: {}  Auth: {}",
        broker.tls,
        if broker.username.is_some() { "yes" } else { "no" }
    );
    println!("   ├─ Client ID: {}", broker.client_id);
    match broker.reconnect.max_retries {
        Some(n) => println!(
            "   ├─ Reconnect: {}ms → {}ms, give up after {}",
            broker.reconnect.initial_backoff_ms, broker.reconnect.max_backoff_ms, n
        ),
        None => println!(
            "   ├─ Reconnect: {}ms → {}ms, forever",
            broker.reconnect.initial_backoff_ms, broker.reconnect.max_backoff_ms
        ),
    }
    println!("   └─ Topics ({})", broker.topics.len());
    for topic in &broker.topics {
        println!("        • {}", topic);
    }

    println!("\n🌡️  Rules ({})", config.rules.len());
    for (i, rule) in config.rules.iter().enumerate() {
        let is_last = i == config.rules.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        let scope = rule.topic.as_deref().unwrap_or("any topic");
        println!(
            "   {} {}: {} >= {} ({})",
            prefix, rule.name, rule.field, rule.threshold, scope
        );
        if args.templates {
            println!("   {}  ├─ Title: {}", child_prefix, rule.title);
            println!("   {}  └─ Body: {}", child_prefix, rule.body);
        }
    }

    let provider = &config.provider;
    println!("\n📤 Provider");
    println!("   ├─ Kind: {:?}", provider.kind);
    if let Some(ref project_id) = provider.project_id {
        println!("   ├─ Project: {}", project_id);
    }
    println!(
        "   ├─ Batches: {} recipients, {} in flight, {}ms timeout",
        provider.batch_size, provider.max_concurrent_batches, provider.batch_timeout_ms
    );
    println!("   └─ Prune invalid: {}", provider.prune_invalid);

    println!("\n📇 Registry: {}", registry_description(config));
    println!("🌐 Ingress: {}", config.ingress.bind);
    println!();
}
