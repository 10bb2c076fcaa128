//! Ingress server lifecycle

use std::net::SocketAddr;

use axum::Router;
use contracts::SubscriberStore;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, instrument};

use crate::error::IngressError;
use crate::routes::{router, IngressState};

/// Bound HTTP server, not yet serving
pub struct IngressServer {
    listener: TcpListener,
    router: Router,
}

impl IngressServer {
    /// Bind `addr` and build the router
    #[instrument(name = "ingress_bind", skip(state))]
    pub async fn bind<S>(addr: &str, state: IngressState<S>) -> Result<Self, IngressError>
    where
        S: SubscriberStore + Send + Sync + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| IngressError::Bind {
                addr: addr.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            listener,
            router: router(state),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, IngressError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` flips to true or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), IngressError> {
        let addr = self.local_addr()?;
        info!(%addr, "Ingress listening");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                while !*shutdown.borrow_and_update() {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                }
            })
            .await?;

        info!("Ingress stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{HealthResponse, RegistrationResponse};
    use contracts::{AddressFormat, BrokerState};
    use registry::Registry;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct Running {
        base: String,
        store: Arc<Registry>,
        broker: watch::Sender<BrokerState>,
        _shutdown: watch::Sender<bool>,
        client: reqwest::Client,
    }

    async fn start(format: AddressFormat) -> Running {
        let store = Arc::new(Registry::in_memory(format));
        let (broker, broker_rx) = watch::channel(BrokerState::Connected);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let server = IngressServer::bind("127.0.0.1:0", IngressState::new(Arc::clone(&store), broker_rx))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run(shutdown_rx));

        Running {
            base: format!("http://{addr}"),
            store,
            broker,
            _shutdown: shutdown,
            client: reqwest::Client::new(),
        }
    }

    impl Running {
        async fn post(&self, path: &str, body: Value) -> reqwest::Response {
            self.client
                .post(format!("{}{}", self.base, path))
                .json(&body)
                .send()
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_register_success() {
        let app = start(AddressFormat::Expo).await;

        let response = app
            .post(
                "/registrations",
                json!({"identity": "u1", "address": "ExponentPushToken[abc123]"}),
            )
            .await;
        assert_eq!(response.status(), 200);
        let body: RegistrationResponse = response.json().await.unwrap();
        assert_eq!(body.status, "registered");
        assert_eq!(body.identity, "u1");

        let all = app.store.list_all().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].address, "ExponentPushToken[abc123]");
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input_without_mutation() {
        let app = start(AddressFormat::Expo).await;

        for body in [
            json!({"identity": "u1"}),
            json!({"address": "ExponentPushToken[abc]"}),
            json!({"identity": "", "address": "ExponentPushToken[abc]"}),
            json!({"identity": "u1", "address": "not-a-token"}),
        ] {
            let response = app.post("/registrations", body).await;
            assert_eq!(response.status(), 400);
            let error: Value = response.json().await.unwrap();
            assert!(error["error"].is_string());
        }

        assert_eq!(app.store.len().await, 0);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = start(AddressFormat::Opaque).await;

        let response = app
            .client
            .post(format!("{}/registrations", app.base))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        let error: Value = response.json().await.unwrap();
        assert!(error["error"].is_string());
        assert_eq!(app.store.len().await, 0);
    }

    #[tokio::test]
    async fn test_legacy_token_route() {
        let app = start(AddressFormat::Opaque).await;

        let response = app
            .post("/api/token", json!({"userId": "u1", "token": "tok-A"}))
            .await;
        assert_eq!(response.status(), 200);

        let response = app
            .post("/api/token", json!({"userId": "u1", "token": "tok-B"}))
            .await;
        assert_eq!(response.status(), 200);

        let all = app.store.list_all().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].address, "tok-B");
    }

    #[tokio::test]
    async fn test_health_reports_broker_state() {
        let app = start(AddressFormat::Opaque).await;
        app.post("/registrations", json!({"identity": "u1", "address": "tok-A"}))
            .await;
        app.broker.send_replace(BrokerState::Reconnecting);

        let health: HealthResponse = app
            .client
            .get(format!("{}/health", app.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(health.status, "ok");
        assert_eq!(health.broker, "reconnecting");
        assert_eq!(health.subscribers, 1);
    }

    #[tokio::test]
    async fn test_bind_error() {
        let store = Arc::new(Registry::in_memory(AddressFormat::Opaque));
        let (_tx, rx) = watch::channel(BrokerState::Disconnected);
        let result = IngressServer::bind("not-an-addr", IngressState::new(store, rx)).await;
        assert!(matches!(result, Err(IngressError::Bind { .. })));
    }
}
