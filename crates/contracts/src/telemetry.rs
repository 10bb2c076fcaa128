//! TelemetryMessage - Broker Client output
//!
//! Decoded sensor reading, consumed once by the rule engine.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Decoded telemetry message
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryMessage {
    /// Topic the message arrived on
    pub topic: String,

    /// Raw payload as received
    #[serde(skip)]
    pub payload: Bytes,

    /// Decoded JSON object
    pub fields: Map<String, Value>,

    /// Arrival time at the relay
    pub received_at: DateTime<Utc>,
}

impl TelemetryMessage {
    /// Numeric value of a field
    ///
    /// Absent, null, string, or otherwise non-numeric fields yield `None`.
    pub fn reading(&self, field: &str) -> Option<f64> {
        self.fields
            .get(field)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(fields: Value) -> TelemetryMessage {
        TelemetryMessage {
            topic: "sensor/temperatura".into(),
            payload: Bytes::new(),
            fields: fields.as_object().cloned().unwrap_or_default(),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn test_reading_numeric() {
        let msg = message(json!({"temperatura": 40, "humedad": 55.5}));
        assert_eq!(msg.reading("temperatura"), Some(40.0));
        assert_eq!(msg.reading("humedad"), Some(55.5));
    }

    #[test]
    fn test_reading_non_numeric() {
        let msg = message(json!({"temperatura": "40", "humedad": null}));
        assert_eq!(msg.reading("temperatura"), None);
        assert_eq!(msg.reading("humedad"), None);
        assert_eq!(msg.reading("missing"), None);
    }
}
