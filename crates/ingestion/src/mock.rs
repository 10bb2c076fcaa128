//! Mock broker transport
//!
//! For tests without a real broker: connect results follow a script and
//! publishes are injected from the test side.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{IngestionError, Result};
use crate::transport::{BrokerTransport, InboundPublish};

/// Scripted result of one connect attempt
#[derive(Debug, Clone)]
pub enum ConnectOutcome {
    /// Connection accepted
    Accept,
    /// Broker refuses the connection
    Refuse(String),
    /// Never returns (drives the connect timeout)
    Hang,
}

/// Event injected into the session
#[derive(Debug, Clone)]
pub enum MockEvent {
    /// One publish
    Publish { topic: String, payload: Bytes },
    /// Drop the current session
    Drop(String),
}

#[derive(Debug, Default)]
struct MockStats {
    connect_attempts: AtomicUsize,
    connects: AtomicUsize,
    subscriptions: Mutex<Vec<String>>,
}

/// Mock transport
///
/// Once the script is spent every connect attempt succeeds.
pub struct MockTransport {
    connect_script: VecDeque<ConnectOutcome>,
    events: mpsc::UnboundedReceiver<MockEvent>,
    stats: Arc<MockStats>,
}

/// Test-side handle: inject publishes, drop sessions, read connect stats
#[derive(Clone)]
pub struct MockBroker {
    tx: mpsc::UnboundedSender<MockEvent>,
    stats: Arc<MockStats>,
}

impl MockTransport {
    /// Create the transport and its test-side handle
    pub fn channel() -> (Self, MockBroker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(MockStats::default());

        let transport = Self {
            connect_script: VecDeque::new(),
            events: rx,
            stats: Arc::clone(&stats),
        };
        (transport, MockBroker { tx, stats })
    }

    /// Set the connect script
    pub fn with_connect_script(mut self, script: impl IntoIterator<Item = ConnectOutcome>) -> Self {
        self.connect_script = script.into_iter().collect();
        self
    }
}

impl BrokerTransport for MockTransport {
    async fn connect(&mut self, topics: &[String]) -> Result<()> {
        self.stats.connect_attempts.fetch_add(1, Ordering::SeqCst);

        match self.connect_script.pop_front().unwrap_or(ConnectOutcome::Accept) {
            ConnectOutcome::Accept => {
                self.stats.connects.fetch_add(1, Ordering::SeqCst);
                if let Ok(mut subscriptions) = self.stats.subscriptions.lock() {
                    subscriptions.extend(topics.iter().cloned());
                }
                debug!(topics = ?topics, "mock broker accepted connection");
                Ok(())
            }
            ConnectOutcome::Refuse(reason) => Err(IngestionError::connect_failed(reason)),
            ConnectOutcome::Hang => std::future::pending().await,
        }
    }

    async fn next_publish(&mut self) -> Result<InboundPublish> {
        match self.events.recv().await {
            Some(MockEvent::Publish { topic, payload }) => Ok(InboundPublish { topic, payload }),
            Some(MockEvent::Drop(reason)) => Err(IngestionError::connection_lost(reason)),
            // Handle released: the session stays silent
            None => std::future::pending().await,
        }
    }
}

impl MockBroker {
    /// Inject a raw payload
    pub fn publish(&self, topic: &str, payload: impl Into<Bytes>) {
        let _ = self.tx.send(MockEvent::Publish {
            topic: topic.to_string(),
            payload: payload.into(),
        });
    }

    /// Inject a JSON payload
    pub fn publish_json(&self, topic: &str, value: &serde_json::Value) {
        self.publish(topic, value.to_string());
    }

    /// Drop the current session
    pub fn drop_connection(&self, reason: &str) {
        let _ = self.tx.send(MockEvent::Drop(reason.to_string()));
    }

    /// Connect attempts so far
    pub fn connect_attempts(&self) -> usize {
        self.stats.connect_attempts.load(Ordering::SeqCst)
    }

    /// Successful connects so far
    pub fn connects(&self) -> usize {
        self.stats.connects.load(Ordering::SeqCst)
    }

    /// Topics subscribed across all connects
    pub fn subscriptions(&self) -> Vec<String> {
        self.stats
            .subscriptions
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_connects() {
        let (transport, broker) = MockTransport::channel();
        let mut transport =
            transport.with_connect_script([ConnectOutcome::Refuse("busy".into())]);
        let topics = vec!["sensor/temperatura".to_string()];

        assert!(transport.connect(&topics).await.is_err());
        assert!(transport.connect(&topics).await.is_ok());
        assert_eq!(broker.connect_attempts(), 2);
        assert_eq!(broker.connects(), 1);
        assert_eq!(broker.subscriptions(), topics);
    }

    #[tokio::test]
    async fn test_injected_events() {
        let (mut transport, broker) = MockTransport::channel();
        broker.publish("sensor/temperatura", "{}");
        broker.drop_connection("reset");

        let publish = transport.next_publish().await.unwrap();
        assert_eq!(publish.topic, "sensor/temperatura");
        assert!(matches!(
            transport.next_publish().await,
            Err(IngestionError::ConnectionLost { .. })
        ));
    }
}
