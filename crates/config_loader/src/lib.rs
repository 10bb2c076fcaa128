//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Apply environment overrides for secrets
//! - Validate configuration legality
//! - Generate `RelayConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("relay.toml")).unwrap();
//! println!("Broker: {}:{}", config.broker.host, config.broker.port);
//! ```

mod env;
mod parser;
mod validator;

pub use contracts::RelayConfig;
pub use env::{
    apply_env_overrides, apply_overrides, ENV_BROKER_HOST, ENV_BROKER_PASSWORD, ENV_BROKER_PORT,
    ENV_BROKER_USERNAME, ENV_PROVIDER_ACCESS_TOKEN,
};
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    /// Environment overrides are applied before validation.
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Invalid override value
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<RelayConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        let mut config = parser::parse(&content, format)?;
        env::apply_env_overrides(&mut config)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from string (no environment overrides)
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<RelayConfig, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Validate an already-built configuration
    pub fn validate(config: &RelayConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    /// Serialize RelayConfig to TOML string (secrets omitted)
    pub fn to_toml(config: &RelayConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize RelayConfig to JSON string (secrets omitted)
    pub fn to_json(config: &RelayConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(content: &str, format: ConfigFormat) -> Result<RelayConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}
