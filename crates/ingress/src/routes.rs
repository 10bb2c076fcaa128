//! HTTP handlers

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use contracts::{BrokerState, SubscriberStore};
use observability::record_registration;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::IngressError;

/// Shared handler state
pub struct IngressState<S> {
    pub store: Arc<S>,
    pub broker: watch::Receiver<BrokerState>,
}

impl<S> Clone for IngressState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            broker: self.broker.clone(),
        }
    }
}

impl<S> IngressState<S> {
    pub fn new(store: Arc<S>, broker: watch::Receiver<BrokerState>) -> Self {
        Self { store, broker }
    }
}

/// `POST /registrations` body
#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// `POST /api/token` body, as sent by the mobile client
#[derive(Debug, Deserialize)]
pub struct LegacyTokenRequest {
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl From<LegacyTokenRequest> for RegistrationRequest {
    fn from(req: LegacyTokenRequest) -> Self {
        Self {
            identity: req.user_id,
            address: req.token,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistrationResponse {
    pub status: String,
    pub identity: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub broker: String,
    pub subscribers: usize,
}

/// Build the ingress router
pub fn router<S>(state: IngressState<S>) -> Router
where
    S: SubscriberStore + Send + Sync + 'static,
{
    Router::new()
        .route("/registrations", post(register::<S>))
        .route("/api/token", post(register_legacy::<S>))
        .route("/health", get(health::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn register<S>(
    State(state): State<IngressState<S>>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<Json<RegistrationResponse>, IngressError>
where
    S: SubscriberStore + Send + Sync + 'static,
{
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            record_registration("invalid");
            warn!(reason = %rejection.body_text(), "Malformed registration body");
            return Err(rejection.into());
        }
    };
    handle_registration(&state, request).await
}

async fn register_legacy<S>(
    State(state): State<IngressState<S>>,
    payload: Result<Json<LegacyTokenRequest>, JsonRejection>,
) -> Result<Json<RegistrationResponse>, IngressError>
where
    S: SubscriberStore + Send + Sync + 'static,
{
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            record_registration("invalid");
            warn!(reason = %rejection.body_text(), "Malformed registration body");
            return Err(rejection.into());
        }
    };
    handle_registration(&state, request.into()).await
}

async fn handle_registration<S>(
    state: &IngressState<S>,
    request: RegistrationRequest,
) -> Result<Json<RegistrationResponse>, IngressError>
where
    S: SubscriberStore + Send + Sync + 'static,
{
    let identity = request.identity.unwrap_or_default();
    let address = request.address.unwrap_or_default();

    match state.store.register(&identity, &address).await {
        Ok(subscriber) => {
            record_registration("ok");
            info!(identity = %subscriber.identity, "Registration accepted");
            Ok(Json(RegistrationResponse {
                status: "registered".to_string(),
                identity: subscriber.identity,
            }))
        }
        Err(e) if e.is_validation() => {
            record_registration("invalid");
            warn!(identity = %identity, error = %e, "Registration rejected");
            Err(e.into())
        }
        Err(e) => {
            record_registration("error");
            Err(e.into())
        }
    }
}

async fn health<S>(State(state): State<IngressState<S>>) -> Json<HealthResponse>
where
    S: SubscriberStore + Send + Sync + 'static,
{
    let broker = *state.broker.borrow();
    Json(HealthResponse {
        status: "ok".to_string(),
        broker: broker.to_string(),
        subscribers: state.store.len().await,
    })
}
