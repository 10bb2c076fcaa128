//! Broker connection supervisor

use std::sync::Arc;
use std::time::Duration;

use contracts::{topic_matches, BrokerConfig, BrokerState, TelemetryMessage};
use observability::{
    record_broker_reconnect, record_broker_state, record_decode_error, record_telemetry_received,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, instrument, warn};

use crate::backoff::Backoff;
use crate::metrics::IngestionMetrics;
use crate::decoder::decode;
use crate::error::{IngestionError, Result};
use crate::transport::BrokerTransport;

enum SessionEnd {
    Shutdown,
    DownstreamClosed,
    Lost(IngestionError),
}

/// Broker Client
///
/// Owns one transport and keeps it connected: subscribes after every
/// connect, decodes publishes into [`TelemetryMessage`] and forwards them on a
/// bounded channel. Connection errors are retried with capped exponential
/// backoff; decode errors are logged and the message dropped.
pub struct BrokerClient<T> {
    config: BrokerConfig,
    transport: T,
    state_tx: watch::Sender<BrokerState>,
    metrics: Arc<IngestionMetrics>,
}

impl<T: BrokerTransport> BrokerClient<T> {
    pub fn new(config: BrokerConfig, transport: T) -> Self {
        let (state_tx, _) = watch::channel(BrokerState::Disconnected);
        Self {
            config,
            transport,
            state_tx,
            metrics: Arc::new(IngestionMetrics::new()),
        }
    }

    /// Observe connection state
    pub fn state(&self) -> watch::Receiver<BrokerState> {
        self.state_tx.subscribe()
    }

    /// Shared counters
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run until shutdown, downstream close, or retry exhaustion
    ///
    /// Returns `Ok(())` on shutdown or when the receiver is dropped and
    /// [`IngestionError::RetriesExhausted`] when `max_retries` consecutive
    /// connect attempts failed. The final state is always `Disconnected`.
    #[instrument(
        name = "broker_client_run",
        skip_all,
        fields(host = %self.config.host, port = self.config.port)
    )]
    pub async fn run(
        mut self,
        tx: mpsc::Sender<TelemetryMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut backoff = Backoff::from(&self.config.reconnect);
        let connect_timeout = Duration::from_millis(self.config.connect_timeout_ms);
        let mut failures: u32 = 0;

        self.set_state(BrokerState::Connecting);

        loop {
            let attempt = tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break,
                attempt = timeout(connect_timeout, self.transport.connect(&self.config.topics)) => attempt,
            };

            match attempt {
                Ok(Ok(())) => {
                    failures = 0;
                    backoff.reset();
                    self.metrics.record_connect();
                    self.set_state(BrokerState::Connected);
                    info!(topics = ?self.config.topics, "Broker connected");

                    match self.session(&tx, &mut shutdown).await {
                        SessionEnd::Shutdown => break,
                        SessionEnd::DownstreamClosed => {
                            info!("Telemetry receiver dropped, stopping broker client");
                            break;
                        }
                        SessionEnd::Lost(e) => {
                            self.metrics.record_disconnect();
                            warn!(error = %e, "Broker session lost");
                        }
                    }
                }
                Ok(Err(e)) => {
                    failures += 1;
                    self.metrics.record_connect_failure();
                    warn!(error = %e, failures, "Broker connect failed");
                }
                Err(_) => {
                    failures += 1;
                    self.metrics.record_connect_failure();
                    let e = IngestionError::ConnectTimeout {
                        timeout_ms: self.config.connect_timeout_ms,
                    };
                    warn!(error = %e, failures, "Broker connect failed");
                }
            }

            if let Some(max_retries) = self.config.reconnect.max_retries {
                if failures > max_retries {
                    self.set_state(BrokerState::Disconnected);
                    error!(failures, max_retries, "Reconnect budget exhausted");
                    return Err(IngestionError::RetriesExhausted { attempts: failures });
                }
            }

            self.set_state(BrokerState::Reconnecting);
            let delay = backoff.next_delay();
            debug!(delay_ms = delay.as_millis() as u64, "Waiting before reconnect");

            tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = sleep(delay) => {}
            }
            record_broker_reconnect();
        }

        self.set_state(BrokerState::Disconnected);
        info!("Broker client stopped");
        Ok(())
    }

    async fn session(
        &mut self,
        tx: &mpsc::Sender<TelemetryMessage>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        loop {
            let publish = tokio::select! {
                _ = wait_for_shutdown(shutdown) => return SessionEnd::Shutdown,
                publish = self.transport.next_publish() => publish,
            };
            let publish = match publish {
                Ok(publish) => publish,
                Err(e) => return SessionEnd::Lost(e),
            };

            if !self.is_subscribed(&publish.topic) {
                self.metrics.record_ignored();
                debug!(topic = %publish.topic, "Ignoring publish on unsubscribed topic");
                continue;
            }

            self.metrics.record_received();
            record_telemetry_received(&publish.topic);

            let message = match decode(&publish.topic, publish.payload) {
                Ok(message) => message,
                Err(e) => {
                    self.metrics.record_decode_error();
                    record_decode_error(&publish.topic);
                    warn!(topic = %publish.topic, error = %e, "Dropping undecodable payload");
                    continue;
                }
            };

            tokio::select! {
                _ = wait_for_shutdown(shutdown) => return SessionEnd::Shutdown,
                sent = tx.send(message) => {
                    if sent.is_err() {
                        return SessionEnd::DownstreamClosed;
                    }
                }
            }
        }
    }

    fn is_subscribed(&self, topic: &str) -> bool {
        self.config
            .topics
            .iter()
            .any(|filter| topic_matches(filter, topic))
    }

    fn set_state(&self, state: BrokerState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Broker state changed");
        }
        record_broker_state(state);
    }
}

impl<T: BrokerTransport + Send + 'static> BrokerClient<T> {
    /// Spawn [`BrokerClient::run`] on the runtime
    pub fn spawn(
        self,
        tx: mpsc::Sender<TelemetryMessage>,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run(tx, shutdown))
    }
}

/// Resolves once shutdown is requested or the sender is gone
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ConnectOutcome, MockBroker, MockTransport};
    use serde_json::json;

    const TOPIC: &str = "sensor/temperatura";

    fn config(max_retries: Option<u32>) -> BrokerConfig {
        serde_json::from_value(json!({
            "host": "broker.local",
            "port": 1883,
            "tls": false,
            "connect_timeout_ms": 50,
            "topics": [TOPIC],
            "reconnect": {
                "initial_backoff_ms": 10,
                "max_backoff_ms": 40,
                "multiplier": 2.0,
                "max_retries": max_retries,
            },
        }))
        .unwrap()
    }

    struct Harness {
        broker: MockBroker,
        state: watch::Receiver<BrokerState>,
        metrics: Arc<IngestionMetrics>,
        rx: mpsc::Receiver<TelemetryMessage>,
        shutdown: watch::Sender<bool>,
        handle: JoinHandle<Result<()>>,
    }

    fn start(max_retries: Option<u32>, script: Vec<ConnectOutcome>) -> Harness {
        let (transport, broker) = MockTransport::channel();
        let client = BrokerClient::new(
            config(max_retries),
            transport.with_connect_script(script),
        );
        let state = client.state();
        let metrics = client.metrics();
        let (tx, rx) = mpsc::channel(16);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = client.spawn(tx, shutdown_rx);

        Harness {
            broker,
            state,
            metrics,
            rx,
            shutdown,
            handle,
        }
    }

    #[tokio::test]
    async fn test_forwards_decoded_messages() {
        let mut h = start(None, vec![]);
        h.state
            .wait_for(|s| *s == BrokerState::Connected)
            .await
            .unwrap();
        assert_eq!(h.broker.subscriptions(), vec![TOPIC.to_string()]);

        h.broker.publish_json(TOPIC, &json!({"temperatura": 40}));
        let msg = h.rx.recv().await.unwrap();
        assert_eq!(msg.reading("temperatura"), Some(40.0));

        h.shutdown.send(true).unwrap();
        h.handle.await.unwrap().unwrap();
        assert_eq!(*h.state.borrow(), BrokerState::Disconnected);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_dropped_without_disconnect() {
        let mut h = start(None, vec![]);

        h.broker.publish(TOPIC, "{not json");
        h.broker.publish(TOPIC, "[1, 2]");
        h.broker.publish_json(TOPIC, &json!({"temperatura": 21.5}));

        let msg = h.rx.recv().await.unwrap();
        assert_eq!(msg.reading("temperatura"), Some(21.5));

        let snapshot = h.metrics.snapshot();
        assert_eq!(snapshot.decode_errors, 2);
        assert_eq!(snapshot.messages_received, 3);
        assert_eq!(snapshot.disconnects, 0);
        assert_eq!(h.broker.connect_attempts(), 1);
        assert_eq!(*h.state.borrow(), BrokerState::Connected);

        h.shutdown.send(true).unwrap();
        h.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_unsubscribed_topic_is_ignored() {
        let mut h = start(None, vec![]);

        h.broker.publish_json("other/topic", &json!({"temperatura": 99}));
        h.broker.publish_json(TOPIC, &json!({"temperatura": 1}));

        let msg = h.rx.recv().await.unwrap();
        assert_eq!(msg.topic, TOPIC);
        assert_eq!(h.metrics.snapshot().ignored_messages, 1);

        h.shutdown.send(true).unwrap();
        h.handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_connected() {
        let h = start(
            None,
            vec![
                ConnectOutcome::Refuse("unavailable".into()),
                ConnectOutcome::Refuse("unavailable".into()),
            ],
        );
        let mut state = h.state.clone();
        state
            .wait_for(|s| *s == BrokerState::Connected)
            .await
            .unwrap();

        assert_eq!(h.broker.connect_attempts(), 3);
        assert_eq!(h.metrics.snapshot().connect_failures, 2);

        h.shutdown.send(true).unwrap();
        h.handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout_counts_as_failure() {
        let h = start(None, vec![ConnectOutcome::Hang]);
        let mut state = h.state.clone();
        state
            .wait_for(|s| *s == BrokerState::Connected)
            .await
            .unwrap();

        assert_eq!(h.metrics.snapshot().connect_failures, 1);
        assert_eq!(h.broker.connects(), 1);

        h.shutdown.send(true).unwrap();
        h.handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let h = start(
            Some(2),
            vec![
                ConnectOutcome::Refuse("down".into()),
                ConnectOutcome::Refuse("down".into()),
                ConnectOutcome::Refuse("down".into()),
                ConnectOutcome::Accept,
            ],
        );

        let err = h.handle.await.unwrap().unwrap_err();
        assert!(matches!(err, IngestionError::RetriesExhausted { attempts: 3 }));
        assert_eq!(h.broker.connect_attempts(), 3);
        assert_eq!(*h.state.borrow(), BrokerState::Disconnected);
        drop(h.shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_session_loss() {
        let mut h = start(Some(0), vec![]);

        h.broker.drop_connection("connection reset");
        h.broker.publish_json(TOPIC, &json!({"temperatura": 37}));

        let msg = h.rx.recv().await.unwrap();
        assert_eq!(msg.reading("temperatura"), Some(37.0));
        assert_eq!(h.broker.connects(), 2);
        assert_eq!(h.metrics.snapshot().disconnects, 1);

        h.shutdown.send(true).unwrap();
        h.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_stops_when_receiver_dropped() {
        let h = start(None, vec![]);
        drop(h.rx);
        h.broker.publish_json(TOPIC, &json!({"temperatura": 40}));

        h.handle.await.unwrap().unwrap();
        assert_eq!(*h.state.borrow(), BrokerState::Disconnected);
        drop(h.shutdown);
    }
}
