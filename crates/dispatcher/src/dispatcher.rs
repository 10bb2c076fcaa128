//! Dispatcher - batched concurrent fan-out to push providers

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{
    AlertEvent, ContractError, DeliveryAttempt, DeliveryOutcome, ProviderConfig, PushMessage,
    PushPriority, PushProvider, PushReceipt, Subscriber, SubscriberStore,
};
use observability::{
    record_batch_latency_ms, record_delivery, record_pruned_address, DispatchAggregator,
};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{error::Elapsed, timeout};
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};

use crate::metrics::{DispatchMetrics, MetricsSnapshot};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Recipients per provider call (before the provider cap)
    pub batch_size: usize,
    /// Bound on one provider call
    pub batch_timeout: Duration,
    /// Provider calls in flight at once
    pub max_concurrent_batches: usize,
    pub sound: Option<String>,
    pub priority: PushPriority,
    /// Remove addresses the provider reports as invalid
    pub prune_invalid: bool,
    /// Attached to every notification's data payload
    pub project_id: Option<String>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::from(&ProviderConfig::default())
    }
}

impl From<&ProviderConfig> for DispatcherConfig {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            batch_timeout: Duration::from_millis(config.batch_timeout_ms),
            max_concurrent_batches: config.max_concurrent_batches,
            sound: config.sound.clone(),
            priority: config.priority,
            prune_invalid: config.prune_invalid,
            project_id: config.project_id.clone(),
        }
    }
}

type BatchResult = Result<Result<Vec<PushReceipt>, ContractError>, Elapsed>;

/// Fans one alert out to every registered subscriber
///
/// The registry is snapshotted once per alert. Batches run concurrently up
/// to `max_concurrent_batches`; a failed or timed-out batch marks only its
/// own recipients as failed.
pub struct Dispatcher<S, P> {
    store: Arc<S>,
    provider: Arc<P>,
    config: DispatcherConfig,
    permits: Arc<Semaphore>,
    metrics: Arc<DispatchMetrics>,
}

impl<S, P> Dispatcher<S, P>
where
    S: SubscriberStore + Send + Sync + 'static,
    P: PushProvider + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, provider: Arc<P>, config: DispatcherConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_batches.max(1)));
        Self {
            store,
            provider,
            config,
            permits,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    /// Shared counters
    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Get metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Effective recipients per provider call
    pub fn batch_size(&self) -> usize {
        self.config
            .batch_size
            .min(self.provider.max_batch_size())
            .max(1)
    }

    /// Deliver `event` to every subscriber
    ///
    /// Returns one attempt per subscriber in the snapshot, ordered by batch.
    #[instrument(
        name = "dispatcher_dispatch",
        skip(self, event),
        fields(rule = %event.rule, value = event.value, provider = %self.provider.name())
    )]
    pub async fn dispatch(&self, event: &AlertEvent) -> Vec<DeliveryAttempt> {
        self.metrics.inc_alerts();

        let subscribers = self.store.list_all().await;
        if subscribers.is_empty() {
            debug!("No subscribers registered, nothing to send");
            return Vec::new();
        }

        let batch_size = self.batch_size();
        let data = self.payload(event);
        let batches: Vec<Vec<Subscriber>> = subscribers
            .chunks(batch_size)
            .map(<[Subscriber]>::to_vec)
            .collect();

        info!(
            subscribers = subscribers.len(),
            batches = batches.len(),
            batch_size,
            "Dispatching alert"
        );

        let mut tasks = JoinSet::new();
        for (index, batch) in batches.iter().enumerate() {
            let messages: Vec<PushMessage> = batch
                .iter()
                .map(|s| {
                    PushMessage::from_alert(
                        &s.address,
                        event,
                        self.config.sound.clone(),
                        self.config.priority,
                        Some(data.clone()),
                    )
                })
                .collect();

            let provider = Arc::clone(&self.provider);
            let permits = Arc::clone(&self.permits);
            let batch_timeout = self.config.batch_timeout;
            self.metrics.inc_batches();

            tasks.spawn(
                async move {
                    let _permit = permits.acquire_owned().await.ok();
                    let started = Instant::now();
                    let result = timeout(batch_timeout, provider.send_batch(&messages)).await;
                    record_batch_latency_ms(
                        provider.name(),
                        started.elapsed().as_secs_f64() * 1000.0,
                    );
                    (index, result)
                }
                .instrument(info_span!("dispatch_batch", index, size = batch.len())),
            );
        }

        let mut results: BTreeMap<usize, BatchResult> = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    results.insert(index, result);
                }
                Err(e) => error!(error = %e, "Batch task failed"),
            }
        }

        let mut attempts = Vec::with_capacity(subscribers.len());
        for (index, batch) in batches.into_iter().enumerate() {
            let outcomes = self.outcomes(index, batch.len(), results.remove(&index));
            attempts.extend(batch.into_iter().zip(outcomes).map(|(subscriber, outcome)| {
                DeliveryAttempt {
                    identity: subscriber.identity,
                    address: subscriber.address,
                    outcome,
                }
            }));
        }

        self.record(&attempts);
        if self.config.prune_invalid {
            self.prune(&attempts).await;
        }
        attempts
    }

    /// Per-recipient outcomes of one batch, always `len` long
    fn outcomes(
        &self,
        index: usize,
        len: usize,
        result: Option<BatchResult>,
    ) -> Vec<DeliveryOutcome> {
        let failure = |reason: String| vec![DeliveryOutcome::Failure { reason }; len];

        match result {
            Some(Ok(Ok(receipts))) => {
                if receipts.len() < len {
                    warn!(
                        batch = index,
                        expected = len,
                        received = receipts.len(),
                        "Missing receipts counted as failures"
                    );
                }
                let mut receipts = receipts.into_iter();
                (0..len)
                    .map(|_| match receipts.next() {
                        Some(receipt) => DeliveryOutcome::from(receipt),
                        None => DeliveryOutcome::Failure {
                            reason: "no receipt from provider".to_string(),
                        },
                    })
                    .collect()
            }
            Some(Ok(Err(e))) => {
                self.metrics.inc_batch_failures();
                warn!(batch = index, error = %e, "Batch delivery failed");
                failure(e.to_string())
            }
            Some(Err(_)) => {
                self.metrics.inc_batch_timeouts();
                let timeout_ms = self.config.batch_timeout.as_millis();
                warn!(batch = index, timeout_ms = timeout_ms as u64, "Batch timed out");
                failure(format!("batch timed out after {timeout_ms}ms"))
            }
            None => {
                self.metrics.inc_batch_failures();
                failure("batch task aborted".to_string())
            }
        }
    }

    fn record(&self, attempts: &[DeliveryAttempt]) {
        let provider = self.provider.name();
        for attempt in attempts {
            record_delivery(provider, attempt);
            match &attempt.outcome {
                DeliveryOutcome::Success { ticket_id } => {
                    self.metrics.inc_delivered();
                    debug!(identity = %attempt.identity, ticket = ?ticket_id, "Delivered");
                }
                DeliveryOutcome::Failure { reason } => {
                    self.metrics.inc_failed();
                    warn!(identity = %attempt.identity, reason = %reason, "Delivery failed");
                }
                DeliveryOutcome::InvalidAddress { reason } => {
                    self.metrics.inc_invalid_addresses();
                    warn!(identity = %attempt.identity, reason = %reason, "Address rejected by provider");
                }
            }
        }
    }

    async fn prune(&self, attempts: &[DeliveryAttempt]) {
        let invalid = attempts
            .iter()
            .filter(|a| matches!(a.outcome, DeliveryOutcome::InvalidAddress { .. }));

        for attempt in invalid {
            match self
                .store
                .remove_if_address(&attempt.identity, &attempt.address)
                .await
            {
                Ok(true) => {
                    self.metrics.inc_pruned();
                    record_pruned_address();
                    info!(identity = %attempt.identity, "Pruned invalid address");
                }
                Ok(false) => {
                    debug!(identity = %attempt.identity, "Address already replaced, not pruned");
                }
                Err(e) => {
                    warn!(identity = %attempt.identity, error = %e, "Failed to prune address");
                }
            }
        }
    }

    fn payload(&self, event: &AlertEvent) -> Value {
        let mut data = json!({
            "rule": event.rule,
            "topic": event.topic,
            "field": event.field,
            "value": event.value,
            "threshold": event.threshold,
        });
        if let (Some(project_id), Some(map)) = (&self.config.project_id, data.as_object_mut()) {
            map.insert("projectId".to_string(), Value::String(project_id.clone()));
        }
        data
    }

    /// Consume alerts until the channel closes
    ///
    /// Returns the aggregated outcome totals.
    #[instrument(name = "dispatcher_run", skip(self, alerts))]
    pub async fn run(self, mut alerts: mpsc::Receiver<AlertEvent>) -> DispatchAggregator {
        info!(provider = %self.provider.name(), "Dispatcher started");
        let mut aggregator = DispatchAggregator::new();

        while let Some(event) = alerts.recv().await {
            let attempts = self.dispatch(&event).await;
            aggregator.update(&event.rule, &attempts);
        }

        info!(
            alerts = aggregator.total_alerts,
            delivered = aggregator.delivered,
            "Dispatcher input closed, shutting down"
        );
        aggregator
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self, alerts: mpsc::Receiver<AlertEvent>) -> JoinHandle<DispatchAggregator> {
        tokio::spawn(self.run(alerts))
    }
}
