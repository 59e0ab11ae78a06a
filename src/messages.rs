use chrono::{DateTime, Local};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresenceEvent {
    pub distance_mm: u32,
}

/// Body posted to the webhook. The `valueN` names are what the automation
/// service expects.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationPayload {
    pub value1: String,
    pub value2: String,
    pub value3: String,
}

impl NotificationPayload {
    pub fn new(event: PresenceEvent, at: DateTime<Local>, device_label: &str) -> Self {
        NotificationPayload {
            value1: format!("distance_mm={}", event.distance_mm),
            value2: at.format(TIMESTAMP_FORMAT).to_string(),
            value3: device_label.to_string(),
        }
    }
}

/// One inbound invocation from the bridge side.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct BridgeCall {
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl BridgeCall {
    /// Parses a JSON line. A bare number is shorthand for calling
    /// `default_method` with that single argument.
    pub fn parse(line: &str, default_method: &str) -> Result<Self, serde_json::Error> {
        match serde_json::from_str::<Value>(line)? {
            Value::Number(n) => Ok(BridgeCall {
                method: default_method.to_string(),
                params: vec![Value::Number(n)],
            }),
            call @ Value::Object(_) => serde_json::from_value(call),
            _ => Err(serde::de::Error::custom(
                "expected a call object or a bare number",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_payload_fields() {
        let at = Local.with_ymd_and_hms(2025, 3, 7, 9, 4, 5).unwrap();
        let payload = NotificationPayload::new(PresenceEvent { distance_mm: 120 }, at, "UNO Q");
        assert_eq!(payload.value1, "distance_mm=120");
        assert_eq!(payload.value2, "2025-03-07 09:04:05");
        assert_eq!(payload.value3, "UNO Q");

        let json: Value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "value1": "distance_mm=120",
                "value2": "2025-03-07 09:04:05",
                "value3": "UNO Q",
            })
        );
    }

    #[test]
    fn test_zero_distance() {
        let payload = NotificationPayload::new(PresenceEvent { distance_mm: 0 }, Local::now(), "UNO Q");
        assert_eq!(payload.value1, "distance_mm=0");
        assert_eq!(payload.value2.len(), 19);
    }

    #[test]
    fn test_parse_call() {
        let call = BridgeCall::parse(r#"{"method":"presence_mm","params":[42]}"#, "x").unwrap();
        assert_eq!(call.method, "presence_mm");
        assert_eq!(call.params, vec![serde_json::json!(42)]);

        let call = BridgeCall::parse("350", "presence_mm").unwrap();
        assert_eq!(call.method, "presence_mm");
        assert_eq!(call.params, vec![serde_json::json!(350)]);

        let call = BridgeCall::parse(r#"{"method":"ping"}"#, "presence_mm").unwrap();
        assert!(call.params.is_empty());

        assert!(BridgeCall::parse("not json", "presence_mm").is_err());
        assert!(BridgeCall::parse(r#"["presence_mm"]"#, "presence_mm").is_err());
        assert!(BridgeCall::parse(r#"["presence_mm",[120]]"#, "presence_mm").is_err());
        assert!(BridgeCall::parse(r#""120""#, "presence_mm").is_err());
        assert!(BridgeCall::parse("null", "presence_mm").is_err());
    }
}
