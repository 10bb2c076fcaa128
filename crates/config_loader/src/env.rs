//! Environment overrides
//!
//! Secrets and deployment-specific endpoints can be supplied through the
//! environment instead of the configuration file.

use contracts::{ContractError, RelayConfig};
use tracing::debug;

pub const ENV_BROKER_HOST: &str = "RELAY_BROKER_HOST";
pub const ENV_BROKER_PORT: &str = "RELAY_BROKER_PORT";
pub const ENV_BROKER_USERNAME: &str = "RELAY_BROKER_USERNAME";
pub const ENV_BROKER_PASSWORD: &str = "RELAY_BROKER_PASSWORD";
pub const ENV_PROVIDER_ACCESS_TOKEN: &str = "RELAY_PROVIDER_ACCESS_TOKEN";

/// Apply overrides from the process environment
pub fn apply_env_overrides(config: &mut RelayConfig) -> Result<(), ContractError> {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Apply overrides from an arbitrary lookup (process env, test maps)
pub fn apply_overrides<F>(config: &mut RelayConfig, lookup: F) -> Result<(), ContractError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup(ENV_BROKER_HOST) {
        debug!(var = ENV_BROKER_HOST, "environment override");
        config.broker.host = host;
    }
    if let Some(port) = lookup(ENV_BROKER_PORT) {
        debug!(var = ENV_BROKER_PORT, "environment override");
        config.broker.port = port.parse().map_err(|_| {
            ContractError::config_validation(
                ENV_BROKER_PORT,
                format!("invalid port '{port}'"),
            )
        })?;
    }
    if let Some(username) = lookup(ENV_BROKER_USERNAME) {
        debug!(var = ENV_BROKER_USERNAME, "environment override");
        config.broker.username = Some(username);
    }
    if let Some(password) = lookup(ENV_BROKER_PASSWORD) {
        debug!(var = ENV_BROKER_PASSWORD, "environment override");
        config.broker.password = Some(password);
    }
    if let Some(token) = lookup(ENV_PROVIDER_ACCESS_TOKEN) {
        debug!(var = ENV_PROVIDER_ACCESS_TOKEN, "environment override");
        config.provider.access_token = Some(token);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser, ConfigFormat};
    use std::collections::HashMap;

    const CONFIG: &str = r#"
[broker]
host = "from-file"
topics = ["sensor/temperatura"]

[[rules]]
name = "hot"
field = "temperatura"
threshold = 36.0
"#;

    #[test]
    fn test_overrides_applied() {
        let mut config = parser::parse(CONFIG, ConfigFormat::Toml).unwrap();
        let vars: HashMap<&str, &str> = [
            (ENV_BROKER_HOST, "from-env"),
            (ENV_BROKER_PORT, "1883"),
            (ENV_BROKER_USERNAME, "relay"),
            (ENV_BROKER_PASSWORD, "pw"),
            (ENV_PROVIDER_ACCESS_TOKEN, "tok"),
        ]
        .into_iter()
        .collect();

        apply_overrides(&mut config, |k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.broker.host, "from-env");
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.broker.username.as_deref(), Some("relay"));
        assert_eq!(config.broker.password.as_deref(), Some("pw"));
        assert_eq!(config.provider.access_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = parser::parse(CONFIG, ConfigFormat::Toml).unwrap();
        let result = apply_overrides(&mut config, |k| {
            (k == ENV_BROKER_PORT).then(|| "not-a-port".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_no_overrides_keeps_file_values() {
        let mut config = parser::parse(CONFIG, ConfigFormat::Toml).unwrap();
        apply_overrides(&mut config, |_| None).unwrap();
        assert_eq!(config.broker.host, "from-file");
        assert!(config.broker.password.is_none());
    }
}
