//! PushProvider trait - Dispatcher output interface

use crate::{AddressFormat, ContractError, PushMessage, PushReceipt};

/// Outbound push-notification provider
#[trait_variant::make(PushProvider: Send)]
pub trait LocalPushProvider {
    /// Provider name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Largest batch a single call accepts
    fn max_batch_size(&self) -> usize;

    /// Address format registrations are validated against
    fn address_format(&self) -> AddressFormat;

    /// Send one batch
    ///
    /// On success returns one receipt per message, in order.
    ///
    /// # Errors
    /// Returns `Delivery` when the whole call failed (transport, HTTP status,
    /// unreadable response).
    async fn send_batch(&self, batch: &[PushMessage]) -> Result<Vec<PushReceipt>, ContractError>;
}
