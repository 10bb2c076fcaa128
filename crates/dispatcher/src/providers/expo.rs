//! ExpoProvider - Expo push service over HTTPS

use std::time::Duration;

use contracts::{
    AddressFormat, ContractError, PushMessage, PushProvider, PushReceipt, ReceiptErrorKind,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::error::DispatcherError;

/// Expo push send endpoint
pub const EXPO_PUSH_ENDPOINT: &str = "https://exp.host/--/api/v2/push/send";

/// Messages accepted per request
pub const EXPO_MAX_BATCH_SIZE: usize = 100;

const PROVIDER_NAME: &str = "expo";

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    data: Vec<Ticket>,
    #[serde(default)]
    errors: Vec<RequestError>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Ticket {
    Ok {
        #[serde(default)]
        id: Option<String>,
    },
    Error {
        #[serde(default)]
        message: String,
        #[serde(default)]
        details: Option<TicketDetails>,
    },
}

#[derive(Debug, Deserialize)]
struct TicketDetails {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RequestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: String,
}

fn error_kind(code: Option<&str>) -> ReceiptErrorKind {
    match code {
        Some("DeviceNotRegistered") => ReceiptErrorKind::DeviceNotRegistered,
        Some("MessageTooBig") => ReceiptErrorKind::MessageTooBig,
        Some("MessageRateExceeded") => ReceiptErrorKind::MessageRateExceeded,
        Some("InvalidCredentials") => ReceiptErrorKind::InvalidCredentials,
        _ => ReceiptErrorKind::Other,
    }
}

impl From<Ticket> for PushReceipt {
    fn from(ticket: Ticket) -> Self {
        match ticket {
            Ticket::Ok { id } => PushReceipt::Ok { id },
            Ticket::Error { message, details } => {
                let code = details.and_then(|d| d.error);
                PushReceipt::Error {
                    kind: error_kind(code.as_deref()),
                    message: match code {
                        Some(code) if message.is_empty() => code,
                        Some(code) => format!("{code}: {message}"),
                        None => message,
                    },
                }
            }
        }
    }
}

/// Provider posting JSON message arrays to the Expo push API
pub struct ExpoProvider {
    endpoint: String,
    headers: HeaderMap,
    client: reqwest::Client,
}

impl ExpoProvider {
    /// Create a new ExpoProvider
    ///
    /// `request_timeout` bounds each HTTP call.
    pub fn new(
        endpoint: impl Into<String>,
        access_token: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, DispatcherError> {
        let endpoint = endpoint.into();
        reqwest::Url::parse(&endpoint).map_err(|e| {
            DispatcherError::provider_creation(PROVIDER_NAME, format!("invalid endpoint: {e}"))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = access_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                DispatcherError::provider_creation(PROVIDER_NAME, format!("invalid access token: {e}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| DispatcherError::provider_creation(PROVIDER_NAME, e.to_string()))?;

        Ok(Self {
            endpoint,
            headers,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn error(message: impl Into<String>) -> ContractError {
        ContractError::delivery(PROVIDER_NAME, message)
    }
}

impl PushProvider for ExpoProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn max_batch_size(&self) -> usize {
        EXPO_MAX_BATCH_SIZE
    }

    fn address_format(&self) -> AddressFormat {
        AddressFormat::Expo
    }

    #[instrument(name = "expo_send_batch", skip(self, batch), fields(size = batch.len()))]
    async fn send_batch(&self, batch: &[PushMessage]) -> Result<Vec<PushReceipt>, ContractError> {
        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .json(batch)
            .send()
            .await
            .map_err(|e| Self::error(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(200).collect();
            return Err(Self::error(format!("status {status}: {excerpt}")));
        }

        let parsed: SendResponse = response
            .json()
            .await
            .map_err(|e| Self::error(format!("unreadable response: {e}")))?;

        if let Some(first) = parsed.errors.first() {
            warn!(
                code = ?first.code,
                message = %first.message,
                "Expo rejected the request"
            );
            if parsed.data.is_empty() {
                return Err(Self::error(format!(
                    "{}: {}",
                    first.code.as_deref().unwrap_or("error"),
                    first.message
                )));
            }
        }

        if parsed.data.len() != batch.len() {
            warn!(
                expected = batch.len(),
                received = parsed.data.len(),
                "Receipt count mismatch"
            );
        }

        debug!(receipts = parsed.data.len(), "Expo batch acknowledged");
        Ok(parsed.data.into_iter().map(PushReceipt::from).collect())
    }
}
