//! Push provider implementations
//!
//! Contains ExpoProvider, LogProvider, and RecordingProvider.

mod expo;
mod log;
mod recording;

pub use self::expo::{ExpoProvider, EXPO_MAX_BATCH_SIZE, EXPO_PUSH_ENDPOINT};
pub use self::log::LogProvider;
pub use self::recording::RecordingProvider;

use std::time::Duration;

use contracts::{
    AddressFormat, ContractError, ProviderConfig, ProviderKind, PushMessage, PushProvider,
    PushReceipt,
};

use crate::error::DispatcherError;

/// Provider selected by configuration
pub enum ConfiguredProvider {
    Expo(ExpoProvider),
    Log(LogProvider),
}

impl ConfiguredProvider {
    /// Build the provider named by `config.kind`
    pub fn from_config(config: &ProviderConfig) -> Result<Self, DispatcherError> {
        match config.kind {
            ProviderKind::Expo => {
                let endpoint = config.endpoint.as_deref().unwrap_or(EXPO_PUSH_ENDPOINT);
                let provider = ExpoProvider::new(
                    endpoint,
                    config.access_token.clone(),
                    Duration::from_millis(config.batch_timeout_ms),
                )?;
                Ok(Self::Expo(provider))
            }
            ProviderKind::Log => Ok(Self::Log(LogProvider::new("log"))),
        }
    }
}

impl PushProvider for ConfiguredProvider {
    fn name(&self) -> &str {
        match self {
            Self::Expo(p) => p.name(),
            Self::Log(p) => p.name(),
        }
    }

    fn max_batch_size(&self) -> usize {
        match self {
            Self::Expo(p) => p.max_batch_size(),
            Self::Log(p) => p.max_batch_size(),
        }
    }

    fn address_format(&self) -> AddressFormat {
        match self {
            Self::Expo(p) => p.address_format(),
            Self::Log(p) => p.address_format(),
        }
    }

    async fn send_batch(&self, batch: &[PushMessage]) -> Result<Vec<PushReceipt>, ContractError> {
        match self {
            Self::Expo(p) => p.send_batch(batch).await,
            Self::Log(p) => p.send_batch(batch).await,
        }
    }
}
