//! Registry - identity keyed subscriber table

use std::collections::HashMap;

use contracts::{AddressFormat, ContractError, RegistryConfig, Subscriber, SubscriberStore};
use observability::record_subscriber_count;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::snapshot::SnapshotFile;

/// Subscriber registry
///
/// Mutated by the ingress handlers and the dispatcher's invalid-address
/// pruning, snapshotted by the dispatcher. With a [`SnapshotFile`] every
/// mutation is persisted before it becomes visible; a failed write leaves
/// the table unchanged.
pub struct Registry {
    entries: RwLock<HashMap<String, Subscriber>>,
    format: AddressFormat,
    snapshot: Option<SnapshotFile>,
    /// Serializes persist + commit so an older snapshot never lands last
    write_lock: Mutex<()>,
}

impl Registry {
    /// Process-lifetime registry
    pub fn in_memory(format: AddressFormat) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            format,
            snapshot: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Registry backed by a snapshot file, loading existing entries
    #[instrument(name = "registry_open", skip(snapshot), fields(path = %snapshot.path().display()))]
    pub async fn open(snapshot: SnapshotFile, format: AddressFormat) -> Result<Self, ContractError> {
        let mut entries = HashMap::new();
        for subscriber in snapshot.load().await? {
            if let Err(e) = format.validate(&subscriber.address) {
                warn!(identity = %subscriber.identity, error = %e, "Skipping stored entry");
                continue;
            }
            entries.insert(subscriber.identity.clone(), subscriber);
        }

        info!(subscribers = entries.len(), "Registry loaded");
        record_subscriber_count(entries.len());

        Ok(Self {
            entries: RwLock::new(entries),
            format,
            snapshot: Some(snapshot),
            write_lock: Mutex::new(()),
        })
    }

    /// Build from configuration
    pub async fn from_config(
        config: &RegistryConfig,
        format: AddressFormat,
    ) -> Result<Self, ContractError> {
        match &config.path {
            Some(path) => Self::open(SnapshotFile::new(path), format).await,
            None => Ok(Self::in_memory(format)),
        }
    }

    pub fn address_format(&self) -> AddressFormat {
        self.format
    }

    pub fn is_persistent(&self) -> bool {
        self.snapshot.is_some()
    }

    fn validate(&self, identity: &str, address: &str) -> Result<(), ContractError> {
        if identity.trim().is_empty() {
            return Err(ContractError::invalid_identity("identity is required"));
        }
        self.format.validate(address)
    }

    async fn persist(&self, subscribers: Vec<Subscriber>) -> Result<(), ContractError> {
        match &self.snapshot {
            Some(file) => file.store(subscribers).await,
            None => Ok(()),
        }
    }
}

impl SubscriberStore for Registry {
    #[instrument(name = "registry_register", skip(self, address), fields(identity = %identity))]
    async fn register(&self, identity: &str, address: &str) -> Result<Subscriber, ContractError> {
        self.validate(identity, address)?;

        let _guard = self.write_lock.lock().await;
        let subscriber = Subscriber::new(identity, address);

        if self.snapshot.is_some() {
            let mut pending: HashMap<_, _> = self.entries.read().await.clone();
            pending.insert(identity.to_string(), subscriber.clone());
            self.persist(pending.into_values().collect()).await?;
        }

        let (previous, count) = {
            let mut entries = self.entries.write().await;
            let previous = entries.insert(identity.to_string(), subscriber.clone());
            (previous, entries.len())
        };

        record_subscriber_count(count);
        debug!(
            identity = %identity,
            replaced = previous.is_some(),
            "Subscriber registered"
        );
        Ok(subscriber)
    }

    async fn list_all(&self) -> Vec<Subscriber> {
        self.entries.read().await.values().cloned().collect()
    }

    #[instrument(name = "registry_remove_if_address", skip(self, address), fields(identity = %identity))]
    async fn remove_if_address(
        &self,
        identity: &str,
        address: &str,
    ) -> Result<bool, ContractError> {
        let _guard = self.write_lock.lock().await;

        let matches = self
            .entries
            .read()
            .await
            .get(identity)
            .is_some_and(|current| current.address == address);
        if !matches {
            return Ok(false);
        }

        if self.snapshot.is_some() {
            let mut pending: HashMap<_, _> = self.entries.read().await.clone();
            pending.remove(identity);
            self.persist(pending.into_values().collect()).await?;
        }

        let count = {
            let mut entries = self.entries.write().await;
            entries.remove(identity);
            entries.len()
        };

        record_subscriber_count(count);
        info!(identity = %identity, "Subscriber removed");
        Ok(true)
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
