//! # Integration Tests
//!
//! Integration and end-to-end tests.
//!
//! Covers:
//! - Contract snapshot checks
//! - Mock e2e runs of the full relay (no broker, no push service)

#[cfg(test)]
mod contract_tests {
    use contracts::{AddressFormat, BrokerState, ProviderKind};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        assert_eq!(BrokerState::default(), BrokerState::Disconnected);
    }

    #[test]
    fn test_provider_kinds_pick_address_formats() {
        assert_eq!(ProviderKind::Expo.address_format(), AddressFormat::Expo);
        assert!(AddressFormat::Expo.is_valid("ExponentPushToken[abc123]"));
        assert!(!AddressFormat::Expo.is_valid("tok-A"));
        assert!(AddressFormat::Opaque.is_valid("tok-A"));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::future::Future;
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{AddressFormat, BrokerState, RelayConfig, SubscriberStore};
    use dispatcher::RecordingProvider;
    use ingestion::{MockBroker, MockTransport};
    use ingress::HealthResponse;
    use push_relay::{RelayPipeline, RunningRelay};
    use registry::Registry;
    use serde_json::json;

    const TOPIC: &str = "sensor/temperatura";

    const CONFIG: &str = r#"
[broker]
host = "mock"
port = 1883
tls = false
topics = ["sensor/temperatura"]

[broker.reconnect]
initial_backoff_ms = 10
max_backoff_ms = 50

[[rules]]
name = "high_temperature"
field = "temperatura"
threshold = 36.0

[provider]
kind = "log"
batch_size = 100

[ingress]
bind = "127.0.0.1:0"
"#;

    fn config() -> RelayConfig {
        ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap()
    }

    struct Harness {
        relay: RunningRelay,
        broker: MockBroker,
        provider: Arc<RecordingProvider>,
        registry: Arc<Registry>,
        http: reqwest::Client,
    }

    impl Harness {
        async fn start(provider: RecordingProvider) -> Self {
            Self::start_with(config(), provider).await
        }

        async fn start_with(config: RelayConfig, provider: RecordingProvider) -> Self {
            let (transport, broker) = MockTransport::channel();
            let provider = Arc::new(provider);
            let registry = Arc::new(Registry::in_memory(AddressFormat::Opaque));

            let relay = RelayPipeline::new(
                config,
                transport,
                Arc::clone(&provider),
                Arc::clone(&registry),
            )
            .start()
            .await
            .unwrap();

            let mut state = relay.broker_state();
            tokio::time::timeout(
                Duration::from_secs(5),
                state.wait_for(|s| *s == BrokerState::Connected),
            )
            .await
            .expect("broker never connected")
            .unwrap();

            Self {
                relay,
                broker,
                provider,
                registry,
                http: reqwest::Client::new(),
            }
        }

        fn url(&self, path: &str) -> String {
            format!("http://{}{}", self.relay.ingress_addr(), path)
        }

        async fn register(&self, identity: &str, address: &str) {
            let response = self
                .http
                .post(self.url("/registrations"))
                .json(&json!({ "identity": identity, "address": address }))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), 200);
        }

        fn publish_reading(&self, value: f64) {
            self.broker.publish_json(TOPIC, &json!({ "temperatura": value }));
        }

        /// Wait until the dispatcher picked up `n` alerts
        ///
        /// `shutdown` drains in-flight dispatches, so totals are read after it.
        async fn alerts_dispatched(&self, n: u64) {
            let metrics = self.relay.dispatch_metrics();
            eventually(|| {
                let metrics = Arc::clone(&metrics);
                async move { metrics.snapshot().alerts >= n }
            })
            .await;
        }

        /// Wait until the broker client took `n` messages off the session
        async fn messages_received(&self, n: u64) {
            let metrics = self.relay.ingestion_metrics();
            eventually(|| {
                let metrics = Arc::clone(&metrics);
                async move { metrics.snapshot().messages_received >= n }
            })
            .await;
        }
    }

    async fn eventually<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !check().await {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached within 5s");
    }

    /// End-to-end: register u1/tok-A, hot reading, one notification to tok-A
    #[tokio::test]
    async fn test_hot_reading_notifies_registered_device() {
        let h = Harness::start(RecordingProvider::new()).await;
        h.register("u1", "tok-A").await;

        h.publish_reading(40.0);
        h.alerts_dispatched(1).await;
        let stats = h.relay.shutdown().await.unwrap();

        let messages = h.provider.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].to, "tok-A");
        assert!(messages[0].body.contains("40"), "body: {}", messages[0].body);

        assert_eq!(stats.alerts_fired, 1);
        assert_eq!(stats.dispatch.delivered, 1);
        assert_eq!(stats.summary.total_alerts, 1);
        assert_eq!(stats.subscribers, 1);
        assert!(stats.broker_error.is_none());
    }

    #[tokio::test]
    async fn test_cool_reading_sends_nothing() {
        let h = Harness::start(RecordingProvider::new()).await;
        h.register("u1", "tok-A").await;

        h.publish_reading(20.0);
        h.messages_received(1).await;

        let stats = h.relay.shutdown().await.unwrap();
        assert_eq!(stats.ingestion.messages_received, 1);
        assert_eq!(stats.alerts_fired, 0);
        assert!(h.provider.messages().is_empty());
    }

    #[tokio::test]
    async fn test_reregistration_moves_notifications_to_new_address() {
        let h = Harness::start(RecordingProvider::new()).await;
        h.register("u1", "tok-A").await;
        h.register("u1", "tok-B").await;

        h.publish_reading(40.0);
        h.alerts_dispatched(1).await;
        h.relay.shutdown().await.unwrap();

        let recipients: Vec<_> = h.provider.messages().into_iter().map(|m| m.to).collect();
        assert_eq!(recipients, vec!["tok-B".to_string()]);
    }

    #[tokio::test]
    async fn test_register_then_list_keeps_latest_address_per_identity() {
        let h = Harness::start(RecordingProvider::new()).await;
        h.register("u1", "tok-A").await;
        h.register("u2", "tok-X").await;
        h.register("u1", "tok-C").await;

        // Mobile client alias lands in the same table
        let response = h
            .http
            .post(h.url("/api/token"))
            .json(&json!({ "userId": "u2", "token": "tok-Y" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let mut all = h.registry.list_all().await;
        all.sort_by(|a, b| a.identity.cmp(&b.identity));
        let pairs: Vec<_> = all
            .iter()
            .map(|s| (s.identity.as_str(), s.address.as_str()))
            .collect();
        assert_eq!(pairs, vec![("u1", "tok-C"), ("u2", "tok-Y")]);

        h.relay.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_payload_is_dropped_without_disconnect() {
        let h = Harness::start(RecordingProvider::new()).await;
        h.register("u1", "tok-A").await;

        h.broker.publish(TOPIC, "{not json");
        h.broker.publish(TOPIC, vec![0xff, 0xfe, 0x00]);
        h.broker.publish_json(TOPIC, &json!([1, 2, 3]));
        h.messages_received(3).await;

        assert_eq!(*h.relay.broker_state().borrow(), BrokerState::Connected);
        assert_eq!(h.broker.connects(), 1);
        assert_eq!(h.registry.len().await, 1);

        // Session still delivers afterwards
        h.publish_reading(41.0);
        h.alerts_dispatched(1).await;

        let stats = h.relay.shutdown().await.unwrap();
        assert_eq!(stats.ingestion.decode_errors, 3);
        assert_eq!(stats.ingestion.disconnects, 0);
        assert_eq!(stats.dispatch.delivered, 1);
    }

    #[tokio::test]
    async fn test_threshold_boundary_is_inclusive() {
        let h = Harness::start(RecordingProvider::new()).await;
        h.register("u1", "tok-A").await;

        h.publish_reading(36.0 - 1e-9);
        h.publish_reading(36.0);
        h.messages_received(2).await;
        h.alerts_dispatched(1).await;

        let stats = h.relay.shutdown().await.unwrap();
        assert_eq!(stats.alerts_fired, 1);
        let messages = h.provider.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].body.contains("36"));
    }

    #[tokio::test]
    async fn test_invalid_address_does_not_block_other_recipients() {
        let provider = RecordingProvider::new()
            .with_max_batch_size(2)
            .reject_address("tok-2");
        let h = Harness::start(provider).await;
        for i in 1..=5 {
            h.register(&format!("u{i}"), &format!("tok-{i}")).await;
        }

        h.publish_reading(40.0);
        h.alerts_dispatched(1).await;
        let stats = h.relay.shutdown().await.unwrap();

        assert_eq!(h.provider.batches().len(), 3);
        let mut recipients: Vec<_> = h.provider.messages().into_iter().map(|m| m.to).collect();
        recipients.sort();
        assert_eq!(recipients, vec!["tok-1", "tok-2", "tok-3", "tok-4", "tok-5"]);

        assert_eq!(stats.dispatch.delivered, 4);
        assert_eq!(stats.dispatch.invalid_addresses, 1);
        assert_eq!(stats.dispatch.pruned, 1);
        assert_eq!(stats.subscribers, 4);
        assert!(h
            .registry
            .list_all()
            .await
            .iter()
            .all(|s| s.address != "tok-2"));
    }

    #[tokio::test]
    async fn test_failed_batch_only_fails_its_recipients() {
        let provider = RecordingProvider::new()
            .with_max_batch_size(1)
            .fail_batches_containing("tok-2");
        let h = Harness::start(provider).await;
        for i in 1..=3 {
            h.register(&format!("u{i}"), &format!("tok-{i}")).await;
        }

        h.publish_reading(40.0);
        h.alerts_dispatched(1).await;

        let stats = h.relay.shutdown().await.unwrap();
        assert_eq!(stats.dispatch.delivered, 2);
        assert_eq!(stats.dispatch.failed, 1);
        assert_eq!(stats.dispatch.batch_failures, 1);
        // Transport failures never prune
        assert_eq!(stats.subscribers, 3);
    }

    #[tokio::test]
    async fn test_reconnect_resubscribes_and_keeps_relaying() {
        let h = Harness::start(RecordingProvider::new()).await;
        h.register("u1", "tok-A").await;

        h.broker.drop_connection("broker restart");
        let broker = h.broker.clone();
        eventually(|| {
            let broker = broker.clone();
            async move { broker.connects() >= 2 }
        })
        .await;

        h.publish_reading(40.0);
        h.alerts_dispatched(1).await;

        assert_eq!(h.broker.subscriptions(), vec![TOPIC.to_string(), TOPIC.to_string()]);
        let stats = h.relay.shutdown().await.unwrap();
        assert_eq!(stats.ingestion.disconnects, 1);
        assert_eq!(stats.dispatch.delivered, 1);
    }

    #[tokio::test]
    async fn test_health_reports_broker_state_and_subscribers() {
        let h = Harness::start(RecordingProvider::new()).await;
        h.register("u1", "tok-A").await;

        let health: HealthResponse = h
            .http
            .get(h.url("/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health.broker, "connected");
        assert_eq!(health.subscribers, 1);

        h.relay.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_topic_rule_fires_under_wildcard_subscription() {
        let mut config = config();
        config.broker.topics = vec!["sensor/+".into()];
        config.rules[0].topic = Some(TOPIC.into());
        ConfigLoader::validate(&config).unwrap();

        let h = Harness::start_with(config, RecordingProvider::new()).await;
        h.register("u1", "tok-A").await;

        h.broker
            .publish_json("sensor/humedad", &json!({ "temperatura": 50 }));
        h.publish_reading(40.0);
        h.alerts_dispatched(1).await;
        h.messages_received(2).await;
        let stats = h.relay.shutdown().await.unwrap();

        assert_eq!(stats.alerts_fired, 1);
        let messages = h.provider.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].body.contains("40"), "body: {}", messages[0].body);
    }

    #[tokio::test]
    async fn test_persistent_registry_survives_relay_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");

        {
            let (transport, _broker) = MockTransport::channel();
            let registry = Arc::new(
                Registry::open(registry::SnapshotFile::new(&path), AddressFormat::Opaque)
                    .await
                    .unwrap(),
            );
            let relay = RelayPipeline::new(
                config(),
                transport,
                Arc::new(RecordingProvider::new()),
                Arc::clone(&registry),
            )
            .start()
            .await
            .unwrap();

            let response = reqwest::Client::new()
                .post(format!("http://{}/registrations", relay.ingress_addr()))
                .json(&json!({ "identity": "u1", "address": "tok-A" }))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), 200);
            relay.shutdown().await.unwrap();
        }

        let reopened = Registry::open(registry::SnapshotFile::new(&path), AddressFormat::Opaque)
            .await
            .unwrap();
        let all = reopened.list_all().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].address, "tok-A");
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_reported() {
        let mut config = config();
        config.broker.reconnect.max_retries = Some(2);

        let (transport, broker) = MockTransport::channel();
        let transport = transport.with_connect_script([
            ingestion::ConnectOutcome::Refuse("not authorized".into()),
            ingestion::ConnectOutcome::Refuse("not authorized".into()),
            ingestion::ConnectOutcome::Refuse("not authorized".into()),
        ]);

        let relay = RelayPipeline::new(
            config,
            transport,
            Arc::new(RecordingProvider::new()),
            Arc::new(Registry::in_memory(AddressFormat::Opaque)),
        )
        .start()
        .await
        .unwrap();

        let stats = tokio::time::timeout(
            Duration::from_secs(5),
            relay.run_until(std::future::pending()),
        )
        .await
        .expect("relay should stop on its own")
        .unwrap();

        assert_eq!(broker.connect_attempts(), 3);
        assert!(stats.broker_error.is_some());
        assert_eq!(stats.ingestion.connect_failures, 3);
    }
}
