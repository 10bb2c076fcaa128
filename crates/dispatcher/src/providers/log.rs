//! LogProvider - logs notifications via tracing

use contracts::{AddressFormat, ContractError, PushMessage, PushProvider, PushReceipt};
use tracing::{info, instrument};

/// Largest batch accepted by the log provider
const LOG_MAX_BATCH_SIZE: usize = 1000;

/// Provider that logs every notification and acknowledges it
pub struct LogProvider {
    name: String,
}

impl LogProvider {
    /// Create a new LogProvider with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl PushProvider for LogProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_batch_size(&self) -> usize {
        LOG_MAX_BATCH_SIZE
    }

    fn address_format(&self) -> AddressFormat {
        AddressFormat::Opaque
    }

    #[instrument(
        name = "log_provider_send_batch",
        skip(self, batch),
        fields(provider = %self.name, size = batch.len())
    )]
    async fn send_batch(&self, batch: &[PushMessage]) -> Result<Vec<PushReceipt>, ContractError> {
        for message in batch {
            info!(
                provider = %self.name,
                to = %message.to,
                title = %message.title,
                body = %message.body,
                "Push notification"
            );
        }
        Ok(batch.iter().map(|_| PushReceipt::Ok { id: None }).collect())
    }
}
