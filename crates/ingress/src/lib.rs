//! # Ingress API
//!
//! HTTP surface for device registrations.
//!
//! Routes:
//! - `POST /registrations` `{identity, address}`
//! - `POST /api/token` `{userId, token}` (mobile client alias)
//! - `GET /health`
//!
//! ```ignore
//! let server = IngressServer::bind(&config.ingress.bind, IngressState::new(registry, broker_state)).await?;
//! tokio::spawn(server.run(shutdown_rx));
//! ```

mod error;
mod routes;
mod server;

pub use error::IngressError;
pub use routes::{
    router, HealthResponse, IngressState, LegacyTokenRequest, RegistrationRequest,
    RegistrationResponse,
};
pub use server::IngressServer;
