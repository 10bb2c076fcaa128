//! RelayConfig - Config Loader output
//!
//! Complete relay configuration: broker connection, alert rules, push
//! provider, registry persistence, HTTP ingress.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{AddressFormat, PushPriority};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Root relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Broker connection
    pub broker: BrokerConfig,

    /// Alert rules
    pub rules: Vec<RuleConfig>,

    /// Push provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Subscriber registry
    #[serde(default)]
    pub registry: RegistryConfig,

    /// HTTP ingress
    #[serde(default)]
    pub ingress: IngressConfig,
}

/// Broker connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker host name
    pub host: String,

    /// Broker port
    #[serde(default = "default_broker_port")]
    pub port: u16,

    /// MQTT client id
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Username credential
    #[serde(default)]
    pub username: Option<String>,

    /// Password credential
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Connect over TLS
    #[serde(default = "default_true")]
    pub tls: bool,

    /// MQTT keep-alive interval (seconds)
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,

    /// Bound on a single connect attempt (milliseconds)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Topics subscribed after every connect
    pub topics: Vec<String>,

    /// Reconnect policy
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Capacity of the decoded-message channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_broker_port() -> u16 {
    8883
}

fn default_client_id() -> String {
    "push-relay".to_string()
}

fn default_true() -> bool {
    true
}

fn default_keep_alive() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    4000
}

fn default_channel_capacity() -> usize {
    256
}

/// Capped exponential backoff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// First retry delay (milliseconds)
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Upper bound on the delay (milliseconds)
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Growth factor per failed attempt
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Consecutive failures before giving up (None = retry forever)
    #[serde(default)]
    pub max_retries: Option<u32>,
}

fn default_initial_backoff() -> u64 {
    1000
}

fn default_max_backoff() -> u64 {
    60_000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            multiplier: default_multiplier(),
            max_retries: None,
        }
    }
}

/// Threshold alert rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Unique rule name
    pub name: String,

    /// Telemetry field holding the reading
    pub field: String,

    /// Fires when `reading >= threshold`
    pub threshold: f64,

    /// Restrict to one topic (None = every subscribed topic)
    #[serde(default)]
    pub topic: Option<String>,

    /// Title template
    #[serde(default = "default_title")]
    pub title: String,

    /// Body template, `{value}` `{field}` `{topic}` `{threshold}` are substituted
    #[serde(default = "default_body")]
    pub body: String,
}

/// Default alert title
pub const DEFAULT_ALERT_TITLE: &str = "🌡️ Alerta de Temperatura";

/// Default alert body
pub const DEFAULT_ALERT_BODY: &str = "El sensor registró {value}°C";

fn default_title() -> String {
    DEFAULT_ALERT_TITLE.to_string()
}

fn default_body() -> String {
    DEFAULT_ALERT_BODY.to_string()
}

/// Push providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Expo push service
    #[default]
    Expo,
    /// Log-only provider (no outbound calls)
    Log,
}

impl ProviderKind {
    /// Address format registrations must satisfy
    pub fn address_format(&self) -> AddressFormat {
        match self {
            Self::Expo => AddressFormat::Expo,
            Self::Log => AddressFormat::Opaque,
        }
    }
}

/// Push provider and fan-out settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider kind
    #[serde(default)]
    pub kind: ProviderKind,

    /// Provider project identifier, attached to every notification payload
    #[serde(default)]
    pub project_id: Option<String>,

    /// Override the provider endpoint URL
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Provider access token
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,

    /// Recipients per batch (capped by the provider maximum)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Bound on a single batch call (milliseconds)
    #[serde(default = "default_batch_timeout")]
    pub batch_timeout_ms: u64,

    /// Batches in flight at once
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,

    /// Notification sound hint
    #[serde(default = "default_sound")]
    pub sound: Option<String>,

    /// Notification priority hint
    #[serde(default)]
    pub priority: PushPriority,

    /// Remove registry entries the provider reports as invalid
    #[serde(default = "default_true")]
    pub prune_invalid: bool,
}

fn default_batch_size() -> usize {
    100
}

fn default_batch_timeout() -> u64 {
    10_000
}

fn default_max_concurrent_batches() -> usize {
    4
}

fn default_sound() -> Option<String> {
    Some("default".to_string())
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            project_id: None,
            endpoint: None,
            access_token: None,
            batch_size: default_batch_size(),
            batch_timeout_ms: default_batch_timeout(),
            max_concurrent_batches: default_max_concurrent_batches(),
            sound: default_sound(),
            priority: PushPriority::default(),
            prune_invalid: true,
        }
    }
}

/// Registry persistence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// JSON snapshot file (None = in-memory only)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// HTTP ingress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngressConfig {
    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_toml() {
        let content = r#"
[broker]
host = "broker.local"
topics = ["sensor/temperatura"]

[[rules]]
name = "hot"
field = "temperatura"
threshold = 36.0
"#;
        let config: RelayConfig = toml::from_str(content).unwrap();
        assert_eq!(config.broker.port, 8883);
        assert!(config.broker.tls);
        assert_eq!(config.broker.reconnect.multiplier, 2.0);
        assert_eq!(config.provider.kind, ProviderKind::Expo);
        assert_eq!(config.provider.batch_size, 100);
        assert_eq!(config.provider.sound.as_deref(), Some("default"));
        assert!(config.registry.path.is_none());
        assert_eq!(config.ingress.bind, "0.0.0.0:3000");
        assert_eq!(config.rules[0].body, "El sensor registró {value}°C");
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let content = r#"
[broker]
host = "broker.local"
username = "relay"
password = "hunter2"
topics = ["t"]

[[rules]]
name = "hot"
field = "temperatura"
threshold = 36.0

[provider]
access_token = "secret-token"
"#;
        let config: RelayConfig = toml::from_str(content).unwrap();
        assert_eq!(config.broker.password.as_deref(), Some("hunter2"));
        let out = toml::to_string(&config).unwrap();
        assert!(!out.contains("hunter2"));
        assert!(!out.contains("secret-token"));
    }

    #[test]
    fn test_provider_address_format() {
        assert_eq!(ProviderKind::Expo.address_format(), AddressFormat::Expo);
        assert_eq!(ProviderKind::Log.address_format(), AddressFormat::Opaque);
    }
}
