//! Relay orchestrator - wires broker, rules, dispatcher and ingress.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use contracts::{
    AlertEvent, BrokerState, PushProvider, RelayConfig, SubscriberStore, TelemetryMessage,
};
use dispatcher::{ConfiguredProvider, DispatchMetrics, Dispatcher, DispatcherConfig};
use ingestion::{BrokerClient, BrokerTransport, IngestionError, IngestionMetrics, MqttTransport};
use ingress::{IngressError, IngressServer, IngressState};
use observability::{record_alert, DispatchAggregator};
use registry::Registry;
use rule_engine::RuleSet;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::stats::RelayStats;
use crate::error::{CliError, Result};

/// Relay pipeline, not yet started
pub struct RelayPipeline<T, P> {
    config: RelayConfig,
    transport: T,
    provider: Arc<P>,
    registry: Arc<Registry>,
}

impl RelayPipeline<MqttTransport, ConfiguredProvider> {
    /// Build the production pipeline: MQTT transport, configured provider,
    /// registry per `[registry]`
    pub async fn from_config(config: RelayConfig) -> Result<Self> {
        let provider = ConfiguredProvider::from_config(&config.provider)
            .map_err(|e| CliError::startup("push provider", e))?;
        let registry = Registry::from_config(&config.registry, provider.address_format())
            .await
            .map_err(|e| CliError::startup("registry", e))?;
        let transport = MqttTransport::new(&config.broker);

        Ok(Self::new(
            config,
            transport,
            Arc::new(provider),
            Arc::new(registry),
        ))
    }
}

impl<T, P> RelayPipeline<T, P>
where
    T: BrokerTransport + Send + 'static,
    P: PushProvider + Send + Sync + 'static,
{
    pub fn new(config: RelayConfig, transport: T, provider: Arc<P>, registry: Arc<Registry>) -> Self {
        Self {
            config,
            transport,
            provider,
            registry,
        }
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Bind the ingress and spawn every stage
    ///
    /// Data flow:
    /// ```text
    /// BrokerClient --mpsc--> rule stage --mpsc--> Dispatcher
    /// ```
    /// Closing the broker client cascades: the rule stage drains and drops
    /// its sender, then the dispatcher drains and returns its totals.
    pub async fn start(self) -> Result<RunningRelay> {
        let Self {
            config,
            transport,
            provider,
            registry,
        } = self;

        info!(
            broker = %format!("{}:{}", config.broker.host, config.broker.port),
            topics = ?config.broker.topics,
            rules = config.rules.len(),
            provider = %provider.name(),
            persistent_registry = registry.is_persistent(),
            "Starting relay"
        );

        let (stop_tx, stop_rx) = watch::channel(false);
        let capacity = config.broker.channel_capacity.max(1);

        let client = BrokerClient::new(config.broker.clone(), transport);
        let broker_state = client.state();
        let ingestion_metrics = client.metrics();

        let server = IngressServer::bind(
            &config.ingress.bind,
            IngressState::new(Arc::clone(&registry), broker_state.clone()),
        )
        .await
        .map_err(|e| CliError::startup("ingress", e))?;
        let ingress_addr = server
            .local_addr()
            .map_err(|e| CliError::startup("ingress", e))?;
        let ingress = tokio::spawn(server.run(stop_rx.clone()));

        let (telemetry_tx, telemetry_rx) = mpsc::channel::<TelemetryMessage>(capacity);
        let (alert_tx, alert_rx) = mpsc::channel::<AlertEvent>(capacity);

        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            provider,
            DispatcherConfig::from(&config.provider),
        );
        let dispatch_metrics = dispatcher.metrics();
        let dispatcher = dispatcher.spawn(alert_rx);

        let rules = RuleSet::from_configs(&config.rules);
        let rules = tokio::spawn(run_rule_stage(rules, telemetry_rx, alert_tx));

        let broker = client.spawn(telemetry_tx, stop_rx);

        info!(%ingress_addr, "Relay started");

        Ok(RunningRelay {
            ingress_addr,
            broker_state,
            stop_tx,
            broker,
            rules,
            dispatcher,
            ingress,
            ingestion_metrics,
            dispatch_metrics,
            registry,
            started: Instant::now(),
        })
    }
}

/// Started relay
pub struct RunningRelay {
    ingress_addr: SocketAddr,
    broker_state: watch::Receiver<BrokerState>,
    stop_tx: watch::Sender<bool>,
    broker: JoinHandle<ingestion::Result<()>>,
    rules: JoinHandle<u64>,
    dispatcher: JoinHandle<DispatchAggregator>,
    ingress: JoinHandle<std::result::Result<(), IngressError>>,
    ingestion_metrics: Arc<IngestionMetrics>,
    dispatch_metrics: Arc<DispatchMetrics>,
    registry: Arc<Registry>,
    started: Instant,
}

impl RunningRelay {
    /// Address the ingress actually bound (resolves port 0)
    pub fn ingress_addr(&self) -> SocketAddr {
        self.ingress_addr
    }

    pub fn broker_state(&self) -> watch::Receiver<BrokerState> {
        self.broker_state.clone()
    }

    pub fn dispatch_metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.dispatch_metrics)
    }

    pub fn ingestion_metrics(&self) -> Arc<IngestionMetrics> {
        Arc::clone(&self.ingestion_metrics)
    }

    /// Stop now and collect the totals
    pub async fn shutdown(self) -> Result<RelayStats> {
        self.run_until(std::future::ready(())).await
    }

    /// Run until `signal` resolves or the broker client ends on its own
    ///
    /// A broker client that gave up is reported in
    /// [`RelayStats::broker_error`]; the other stages are still drained.
    pub async fn run_until<F>(self, signal: F) -> Result<RelayStats>
    where
        F: Future<Output = ()>,
    {
        let Self {
            broker_state: _,
            ingress_addr: _,
            stop_tx,
            mut broker,
            rules,
            dispatcher,
            ingress,
            ingestion_metrics,
            dispatch_metrics,
            registry,
            started,
        } = self;

        let finished_early = tokio::select! {
            _ = signal => {
                info!("Shutdown requested, stopping relay");
                None
            }
            joined = &mut broker => Some(joined),
        };

        // Ingress and broker client both watch this
        let _ = stop_tx.send(true);

        let broker_outcome = match finished_early {
            Some(joined) => joined,
            None => broker.await,
        };
        let broker_error = match broker_outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => {
                error!(error = %e, "Broker client gave up");
                Some(broker_failure(&e))
            }
            Err(e) => return Err(CliError::task("broker client", e)),
        };

        let alerts_fired = rules
            .await
            .map_err(|e| CliError::task("rule stage", e))?;
        let aggregator = dispatcher
            .await
            .map_err(|e| CliError::task("dispatcher", e))?;

        match ingress.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Ingress stopped with error"),
            Err(e) => return Err(CliError::task("ingress", e)),
        }

        let stats = RelayStats {
            duration: started.elapsed(),
            ingestion: ingestion_metrics.snapshot(),
            dispatch: dispatch_metrics.snapshot(),
            summary: aggregator.summary(),
            alerts_fired,
            subscribers: registry.len().await,
            broker_error,
        };

        info!(
            alerts = stats.alerts_fired,
            delivered = stats.dispatch.delivered,
            "Relay stopped"
        );
        Ok(stats)
    }
}

fn broker_failure(e: &IngestionError) -> String {
    match e {
        IngestionError::RetriesExhausted { attempts } => {
            format!("gave up after {attempts} consecutive connect failures")
        }
        other => other.to_string(),
    }
}

/// Evaluate every message against the rule set and forward the alerts
///
/// Returns the number of alerts fired.
async fn run_rule_stage(
    rules: RuleSet,
    mut telemetry: mpsc::Receiver<TelemetryMessage>,
    alerts: mpsc::Sender<AlertEvent>,
) -> u64 {
    let mut fired = 0u64;

    while let Some(message) = telemetry.recv().await {
        for event in rules.evaluate(&message) {
            record_alert(&event.rule);
            fired += 1;
            debug!(rule = %event.rule, value = event.value, topic = %event.topic, "Alert fired");

            if alerts.send(event).await.is_err() {
                warn!("Dispatcher closed, stopping rule stage");
                return fired;
            }
        }
    }

    debug!(fired, "Telemetry channel closed, rule stage finished");
    fired
}
