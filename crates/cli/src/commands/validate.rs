//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ProviderKind, RelayConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

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
    broker: String,
    topic_count: usize,
    rule_count: usize,
    provider: String,
    persistent_registry: bool,
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
                    broker: format!("{}:{}", config.broker.host, config.broker.port),
                    topic_count: config.broker.topics.len(),
                    rule_count: config.rules.len(),
                    provider: format!("{:?}", config.provider.kind),
                    persistent_registry: config.registry.path.is_some(),
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
fn collect_warnings(config: &RelayConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.provider.kind == ProviderKind::Log {
        warnings.push("provider.kind = \"log\" - alerts are logged, not delivered".to_string());
    }

    if config.registry.path.is_none() {
        warnings.push(
            "registry.path is not set - registrations are lost on restart".to_string(),
        );
    }

    let has_credentials = config.broker.username.is_some() || config.broker.password.is_some();
    if !config.broker.tls && has_credentials {
        warnings.push("broker.tls is disabled - credentials are sent in cleartext".to_string());
    }

    if config.provider.kind == ProviderKind::Expo && config.provider.access_token.is_none() {
        warnings.push(
            "provider.access_token is not set - Expo requests are sent unauthenticated"
                .to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Broker: {}", summary.broker);
            println!("  Topics: {}", summary.topic_count);
            println!("  Rules: {}", summary.rule_count);
            println!("  Provider: {}", summary.provider);
            println!("  Persistent registry: {}", summary.persistent_registry);
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
