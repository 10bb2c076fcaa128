//! Payload decoding

use bytes::Bytes;
use chrono::Utc;
use contracts::TelemetryMessage;
use serde_json::Value;

use crate::error::{IngestionError, Result};

/// Decode a publish payload into telemetry
///
/// The payload must be a UTF-8 JSON object.
pub fn decode(topic: &str, payload: Bytes) -> Result<TelemetryMessage> {
    let text = std::str::from_utf8(&payload)
        .map_err(|e| IngestionError::decode(topic, format!("payload is not UTF-8: {e}")))?;

    let value: Value = serde_json::from_str(text)
        .map_err(|e| IngestionError::decode(topic, format!("malformed JSON: {e}")))?;

    let Value::Object(fields) = value else {
        return Err(IngestionError::decode(
            topic,
            "payload is not a JSON object",
        ));
    };

    Ok(TelemetryMessage {
        topic: topic.to_string(),
        payload,
        fields,
        received_at: Utc::now(),
    })
}
