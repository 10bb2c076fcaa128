//! rumqttc-backed transport

use std::time::Duration;

use contracts::BrokerConfig;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS, SubscribeFilter,
    Transport,
};
use tracing::{debug, instrument};

use crate::error::{IngestionError, Result};
use crate::transport::{BrokerTransport, InboundPublish};

const REQUEST_CHANNEL_CAPACITY: usize = 16;

/// MQTT 3.1.1 transport over TCP or TLS
pub struct MqttTransport {
    options: MqttOptions,
    session: Option<(AsyncClient, EventLoop)>,
}

impl MqttTransport {
    pub fn new(config: &BrokerConfig) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        options.set_clean_session(true);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }
        if config.tls {
            options.set_transport(Transport::tls_with_default_config());
        }

        Self {
            options,
            session: None,
        }
    }
}

impl BrokerTransport for MqttTransport {
    #[instrument(name = "mqtt_connect", skip(self, topics), fields(broker = %self.options.broker_address().0))]
    async fn connect(&mut self, topics: &[String]) -> Result<()> {
        self.session = None;
        let (client, mut eventloop) = AsyncClient::new(self.options.clone(), REQUEST_CHANNEL_CAPACITY);

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code != ConnectReturnCode::Success {
                        return Err(IngestionError::connect_failed(format!(
                            "broker refused connection: {:?}",
                            ack.code
                        )));
                    }
                    break;
                }
                Ok(_) => continue,
                Err(e) => return Err(IngestionError::connect_failed(e.to_string())),
            }
        }

        let filters = topics
            .iter()
            .map(|topic| SubscribeFilter::new(topic.clone(), QoS::AtMostOnce));
        client
            .subscribe_many(filters)
            .await
            .map_err(|e| IngestionError::connect_failed(format!("subscribe failed: {e}")))?;

        debug!(topics = ?topics, "subscribe requested");
        self.session = Some((client, eventloop));
        Ok(())
    }

    async fn next_publish(&mut self) -> Result<InboundPublish> {
        let Some((_, eventloop)) = self.session.as_mut() else {
            return Err(IngestionError::connection_lost("not connected"));
        };

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    return Ok(InboundPublish {
                        topic: publish.topic,
                        payload: publish.payload,
                    });
                }
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    debug!(codes = ?ack.return_codes, "subscription acknowledged");
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    self.session = None;
                    return Err(IngestionError::connection_lost("broker sent disconnect"));
                }
                Ok(_) => continue,
                Err(e) => {
                    self.session = None;
                    return Err(IngestionError::connection_lost(e.to_string()));
                }
            }
        }
    }
}
