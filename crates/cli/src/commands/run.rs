//! `run` command implementation.

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use contracts::RelayConfig;
use push_relay::{CliError, RelayPipeline};

use crate::cli::RunArgs;

/// Execute the `run` command
pub async fn run_relay(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_cli_overrides(&mut config, args);
    config_loader::ConfigLoader::validate(&config).context("Invalid command-line override")?;

    info!(
        broker = %format!("{}:{}", config.broker.host, config.broker.port),
        topics = config.broker.topics.len(),
        rules = config.rules.len(),
        provider = ?config.provider.kind,
        bind = %config.ingress.bind,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)
            .context("Failed to start metrics exporter")?;
        info!(port = args.metrics_port, "Prometheus metrics exporter listening");
    }

    let relay = RelayPipeline::from_config(config)
        .await?
        .start()
        .await
        .context("Failed to start relay")?;

    let stats = relay.run_until(shutdown_signal()).await?;
    stats.print_summary();

    if let Some(message) = stats.broker_error {
        return Err(CliError::broker(message).into());
    }

    info!("push-relay finished");
    Ok(())
}

fn apply_cli_overrides(config: &mut RelayConfig, args: &RunArgs) {
    if let Some(ref bind) = args.bind {
        info!(bind = %bind, "Overriding ingress bind address from CLI");
        config.ingress.bind = bind.clone();
    }
    if let Some(capacity) = args.channel_capacity {
        info!(capacity, "Overriding channel capacity from CLI");
        config.broker.channel_capacity = capacity;
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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
    warn!("Received shutdown signal");
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &RelayConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Broker:");
    println!(
        "  {}:{} (tls: {}, client id: {})",
        config.broker.host, config.broker.port, config.broker.tls, config.broker.client_id
    );
    for topic in &config.broker.topics {
        println!("  - {}", topic);
    }

    println!("\nRules ({}):", config.rules.len());
    for rule in &config.rules {
        println!(
            "  - {}: {} >= {}{}",
            rule.name,
            rule.field,
            rule.threshold,
            rule.topic
                .as_deref()
                .map(|t| format!(" on {t}"))
                .unwrap_or_default()
        );
    }

    println!("\nProvider: {:?}", config.provider.kind);
    println!("  Batch size: {}", config.provider.batch_size);
    println!(
        "  Registry: {}",
        config
            .registry
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "in-memory".to_string())
    );
    println!("  Ingress: {}", config.ingress.bind);
    println!();
}
