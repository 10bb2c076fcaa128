//! Configuration validation
//!
//! Rules:
//! - broker host non-empty, port > 0, at least one non-empty topic
//! - credentials come in pairs
//! - backoff bounds ordered, multiplier >= 1, timeouts non-zero
//! - at least one rule, rule names unique, thresholds finite
//! - a rule's topic must be covered by a subscription filter
//! - batch size and concurrency >= 1

use std::collections::HashSet;

use contracts::{topic_matches, ContractError, RelayConfig};

/// Validate a RelayConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &RelayConfig) -> Result<(), ContractError> {
    validate_broker(config)?;
    validate_reconnect(config)?;
    validate_rules(config)?;
    validate_provider(config)?;
    validate_ingress(config)?;
    Ok(())
}

fn validate_broker(config: &RelayConfig) -> Result<(), ContractError> {
    let broker = &config.broker;

    if broker.host.trim().is_empty() {
        return Err(ContractError::config_validation(
            "broker.host",
            "broker host cannot be empty",
        ));
    }
    if broker.port == 0 {
        return Err(ContractError::config_validation(
            "broker.port",
            "broker port must be > 0",
        ));
    }
    if broker.client_id.is_empty() {
        return Err(ContractError::config_validation(
            "broker.client_id",
            "client_id cannot be empty",
        ));
    }
    if broker.topics.is_empty() {
        return Err(ContractError::config_validation(
            "broker.topics",
            "at least one topic is required",
        ));
    }
    for (idx, topic) in broker.topics.iter().enumerate() {
        if topic.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("broker.topics[{idx}]"),
                "topic cannot be empty",
            ));
        }
    }
    if broker.username.is_some() != broker.password.is_some() {
        return Err(ContractError::config_validation(
            "broker.username / broker.password",
            "username and password must be set together",
        ));
    }
    if broker.connect_timeout_ms == 0 {
        return Err(ContractError::config_validation(
            "broker.connect_timeout_ms",
            "connect_timeout_ms must be > 0",
        ));
    }
    if broker.channel_capacity == 0 {
        return Err(ContractError::config_validation(
            "broker.channel_capacity",
            "channel_capacity must be > 0",
        ));
    }
    Ok(())
}

fn validate_reconnect(config: &RelayConfig) -> Result<(), ContractError> {
    let reconnect = &config.broker.reconnect;

    if reconnect.initial_backoff_ms > reconnect.max_backoff_ms {
        return Err(ContractError::config_validation(
            "broker.reconnect.initial_backoff_ms / broker.reconnect.max_backoff_ms",
            format!(
                "initial_backoff_ms ({}) must be <= max_backoff_ms ({})",
                reconnect.initial_backoff_ms, reconnect.max_backoff_ms
            ),
        ));
    }
    if !(reconnect.multiplier.is_finite() && reconnect.multiplier >= 1.0) {
        return Err(ContractError::config_validation(
            "broker.reconnect.multiplier",
            format!("multiplier must be >= 1.0, got {}", reconnect.multiplier),
        ));
    }
    Ok(())
}

fn validate_rules(config: &RelayConfig) -> Result<(), ContractError> {
    if config.rules.is_empty() {
        return Err(ContractError::config_validation(
            "rules",
            "at least one rule is required",
        ));
    }

    let mut seen = HashSet::new();

    for rule in &config.rules {
        if rule.name.is_empty() {
            return Err(ContractError::config_validation(
                "rules[].name",
                "rule name cannot be empty",
            ));
        }
        if !seen.insert(rule.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("rules[name={}]", rule.name),
                "duplicate rule name",
            ));
        }
        if rule.field.is_empty() {
            return Err(ContractError::config_validation(
                format!("rules[{}].field", rule.name),
                "field cannot be empty",
            ));
        }
        if !rule.threshold.is_finite() {
            return Err(ContractError::config_validation(
                format!("rules[{}].threshold", rule.name),
                format!("threshold must be finite, got {}", rule.threshold),
            ));
        }
        if let Some(topic) = &rule.topic {
            let covered = config
                .broker
                .topics
                .iter()
                .any(|filter| topic_matches(filter, topic));
            if !covered {
                return Err(ContractError::config_validation(
                    format!("rules[{}].topic", rule.name),
                    format!("topic '{topic}' is not covered by any broker.topics filter"),
                ));
            }
        }
    }
    Ok(())
}

fn validate_provider(config: &RelayConfig) -> Result<(), ContractError> {
    let provider = &config.provider;

    if provider.batch_size == 0 {
        return Err(ContractError::config_validation(
            "provider.batch_size",
            "batch_size must be > 0",
        ));
    }
    if provider.batch_timeout_ms == 0 {
        return Err(ContractError::config_validation(
            "provider.batch_timeout_ms",
            "batch_timeout_ms must be > 0",
        ));
    }
    if provider.max_concurrent_batches == 0 {
        return Err(ContractError::config_validation(
            "provider.max_concurrent_batches",
            "max_concurrent_batches must be > 0",
        ));
    }
    Ok(())
}

fn validate_ingress(config: &RelayConfig) -> Result<(), ContractError> {
    if config.ingress.bind.parse::<std::net::SocketAddr>().is_err() {
        return Err(ContractError::config_validation(
            "ingress.bind",
            format!("invalid socket address '{}'", config.ingress.bind),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        BrokerConfig, ConfigVersion, IngressConfig, ProviderConfig, ReconnectConfig,
        RegistryConfig, RuleConfig,
    };

    fn minimal_config() -> RelayConfig {
        RelayConfig {
            version: ConfigVersion::V1,
            broker: BrokerConfig {
                host: "broker.local".into(),
                port: 8883,
                client_id: "push-relay".into(),
                username: Some("relay".into()),
                password: Some("secret".into()),
                tls: true,
                keep_alive_secs: 30,
                connect_timeout_ms: 4000,
                topics: vec!["sensor/temperatura".into()],
                reconnect: ReconnectConfig::default(),
                channel_capacity: 16,
            },
            rules: vec![RuleConfig {
                name: "hot".into(),
                field: "temperatura".into(),
                threshold: 36.0,
                topic: None,
                title: "t".into(),
                body: "{value}".into(),
            }],
            provider: ProviderConfig::default(),
            registry: RegistryConfig::default(),
            ingress: IngressConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn test_empty_topics() {
        let mut config = minimal_config();
        config.broker.topics.clear();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("at least one topic"), "got: {err}");
    }

    #[test]
    fn test_unpaired_credentials() {
        let mut config = minimal_config();
        config.broker.password = None;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("set together"), "got: {err}");
    }

    #[test]
    fn test_backoff_range() {
        let mut config = minimal_config();
        config.broker.reconnect.initial_backoff_ms = 10_000;
        config.broker.reconnect.max_backoff_ms = 500;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("initial_backoff_ms"), "got: {err}");
    }

    #[test]
    fn test_multiplier_below_one() {
        let mut config = minimal_config();
        config.broker.reconnect.multiplier = 0.5;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("multiplier"), "got: {err}");
    }

    #[test]
    fn test_duplicate_rule_name() {
        let mut config = minimal_config();
        config.rules.push(config.rules[0].clone());
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("duplicate rule name"), "got: {err}");
    }

    #[test]
    fn test_non_finite_threshold() {
        let mut config = minimal_config();
        config.rules[0].threshold = f64::NAN;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("finite"), "got: {err}");
    }

    #[test]
    fn test_rule_topic_not_subscribed() {
        let mut config = minimal_config();
        config.rules[0].topic = Some("sensor/humedad".into());
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("not covered"), "got: {err}");
    }

    #[test]
    fn test_rule_topic_under_wildcard_subscription() {
        let mut config = minimal_config();
        config.broker.topics = vec!["sensor/+".into()];

        config.rules[0].topic = Some("sensor/temperatura".into());
        assert!(validate(&config).is_ok());

        config.rules[0].topic = Some("sensor/+".into());
        assert!(validate(&config).is_ok());

        config.rules[0].topic = Some("planta/temperatura".into());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_batch_size() {
        let mut config = minimal_config();
        config.provider.batch_size = 0;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("batch_size"), "got: {err}");
    }

    #[test]
    fn test_invalid_bind() {
        let mut config = minimal_config();
        config.ingress.bind = "localhost".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("ingress.bind"), "got: {err}");
    }
}
