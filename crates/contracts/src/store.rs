//! SubscriberStore trait - Registry interface
//!
//! Written by the Ingress API, snapshotted by the Dispatcher.

use crate::{ContractError, Subscriber};

/// Subscriber table keyed by identity
///
/// Implementations must make `list_all` a snapshot: concurrent registration
/// never disrupts a caller iterating the returned list.
#[trait_variant::make(SubscriberStore: Send)]
pub trait LocalSubscriberStore {
    /// Insert or overwrite the address for `identity` (last write wins)
    ///
    /// # Errors
    /// `InvalidIdentity` / `InvalidAddress` when input fails validation;
    /// `Persistence` when a durable backend cannot store the change.
    async fn register(&self, identity: &str, address: &str) -> Result<Subscriber, ContractError>;

    /// Snapshot of every registered subscriber
    async fn list_all(&self) -> Vec<Subscriber>;

    /// Remove `identity` only if its current address is still `address`
    ///
    /// Returns whether an entry was removed.
    async fn remove_if_address(&self, identity: &str, address: &str)
        -> Result<bool, ContractError>;

    /// Number of registered subscribers
    async fn len(&self) -> usize;
}
