//! RecordingProvider - in-memory provider for tests
//!
//! Records every batch and answers according to a small script.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use contracts::{
    AddressFormat, ContractError, PushMessage, PushProvider, PushReceipt, ReceiptErrorKind,
};

/// Provider that records what it was asked to send
pub struct RecordingProvider {
    name: String,
    max_batch_size: usize,
    rejected: HashSet<String>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    receipt_limit: Option<usize>,
    batches: Mutex<Vec<Vec<PushMessage>>>,
}

impl Default for RecordingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self {
            name: "recording".to_string(),
            max_batch_size: 100,
            rejected: HashSet::new(),
            failing: HashSet::new(),
            delay: None,
            receipt_limit: None,
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Answer `DeviceNotRegistered` for this address
    pub fn reject_address(mut self, address: impl Into<String>) -> Self {
        self.rejected.insert(address.into());
        self
    }

    /// Fail the whole call for any batch containing this address
    pub fn fail_batches_containing(mut self, address: impl Into<String>) -> Self {
        self.failing.insert(address.into());
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Return at most `limit` receipts per batch
    pub fn with_receipt_limit(mut self, limit: usize) -> Self {
        self.receipt_limit = Some(limit);
        self
    }

    /// Every batch received, in call order
    pub fn batches(&self) -> Vec<Vec<PushMessage>> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }

    /// Every message received, flattened
    pub fn messages(&self) -> Vec<PushMessage> {
        self.batches().into_iter().flatten().collect()
    }

    fn record(&self, batch: &[PushMessage]) {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(batch.to_vec());
        }
    }
}

impl PushProvider for RecordingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn address_format(&self) -> AddressFormat {
        AddressFormat::Opaque
    }

    async fn send_batch(&self, batch: &[PushMessage]) -> Result<Vec<PushReceipt>, ContractError> {
        self.record(batch);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if batch.iter().any(|m| self.failing.contains(&m.to)) {
            return Err(ContractError::delivery(&self.name, "scripted batch failure"));
        }

        let receipts = batch.iter().map(|m| {
            if self.rejected.contains(&m.to) {
                PushReceipt::Error {
                    message: "DeviceNotRegistered".to_string(),
                    kind: ReceiptErrorKind::DeviceNotRegistered,
                }
            } else {
                PushReceipt::Ok {
                    id: Some(format!("ticket-{}", m.to)),
                }
            }
        });

        Ok(match self.receipt_limit {
            Some(limit) => receipts.take(limit).collect(),
            None => receipts.collect(),
        })
    }
}
