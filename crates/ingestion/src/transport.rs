//! Broker transport seam

use bytes::Bytes;

use crate::error::Result;

/// One inbound publish
#[derive(Debug, Clone)]
pub struct InboundPublish {
    pub topic: String,
    pub payload: Bytes,
}

/// Broker transport
///
/// `connect` establishes a fresh session and subscribes to `topics` at QoS 0;
/// it resolves once the broker acknowledged the connection. `next_publish`
/// yields publishes until the session drops, after which `connect` is called
/// again.
#[trait_variant::make(BrokerTransport: Send)]
pub trait LocalBrokerTransport {
    async fn connect(&mut self, topics: &[String]) -> Result<()>;

    async fn next_publish(&mut self) -> Result<InboundPublish>;
}
