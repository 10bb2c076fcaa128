//! # Broker Client
//!
//! Telemetry ingestion from the MQTT broker.
//!
//! Responsibilities:
//! - Keep one supervised broker connection (capped exponential backoff)
//! - Subscribe to the configured topics at QoS 0 after every connect
//! - Decode UTF-8 JSON payloads into `TelemetryMessage`
//! - Publish connection state on a `watch` channel
//! - Send telemetry downstream on a bounded `mpsc` channel
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{BrokerClient, MqttTransport};
//!
//! let client = BrokerClient::new(config.broker.clone(), MqttTransport::new(&config.broker));
//! let state = client.state();
//! let (tx, mut rx) = tokio::sync::mpsc::channel(config.broker.channel_capacity);
//! let handle = client.spawn(tx, shutdown_rx);
//!
//! while let Some(message) = rx.recv().await {
//!     // Evaluate rules
//! }
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::MockTransport;
//!
//! let (transport, broker) = MockTransport::channel();
//! broker.publish_json("sensor/temperatura", &serde_json::json!({"temperatura": 40}));
//! ```

mod backoff;
mod client;
mod decoder;
mod error;
mod metrics;
mod mock;
mod mqtt;
mod transport;

// Re-exports
pub use backoff::Backoff;
pub use client::BrokerClient;
pub use contracts::{topic_matches, BrokerState, TelemetryMessage};
pub use decoder::decode;
pub use error::{IngestionError, Result};
pub use metrics::{IngestionMetrics, MetricsSnapshot};
pub use mock::{ConnectOutcome, MockBroker, MockEvent, MockTransport};
pub use mqtt::MqttTransport;
pub use transport::{BrokerTransport, InboundPublish, LocalBrokerTransport};
