//! Wire types for the ingestion API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Per-event failures of a batch, keyed by the event's 0-based position in
/// the batch that was sent. Indices that are absent succeeded.
pub type ErrorIndex = BTreeMap<usize, String>;

/// A single unit of ingestion: a payload destined for a table.
///
/// The payload can be any serializable type and defaults to an arbitrary
/// JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEvent<T>")]
pub struct Event<T = serde_json::Value> {
    table_name: String,
    data: T,
}

impl<T> Event<T> {
    /// Creates an event.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::EmptyTableName`] if `table_name` is empty.
    pub fn new(table_name: impl Into<String>, data: T) -> Result<Self, IngestError> {
        let table_name = table_name.into();
        if table_name.is_empty() {
            return Err(IngestError::EmptyTableName);
        }
        Ok(Self { table_name, data })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

#[derive(Deserialize)]
struct RawEvent<T> {
    table_name: String,
    data: T,
}

impl<T> TryFrom<RawEvent<T>> for Event<T> {
    type Error = IngestError;

    fn try_from(raw: RawEvent<T>) -> Result<Self, Self::Error> {
        Event::new(raw.table_name, raw.data)
    }
}

/// Request body for batch submissions.
#[derive(Debug, Serialize)]
pub(crate) struct BatchRequest<'a, T> {
    pub events: &'a [Event<T>],
}

/// Response body for batch submissions, for both success and failure statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct BatchResponse {
    #[serde(default)]
    pub errors: Option<ErrorIndex>,
}

/// Failure body for single-event and table submissions.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let event = Event::new("test_table", json!({"field": "value"})).unwrap();
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"table_name": "test_table", "data": {"field": "value"}})
        );
    }

    #[test]
    fn test_event_rejects_empty_table_name() {
        let err = Event::new("", json!(null)).unwrap_err();
        assert!(matches!(err, IngestError::EmptyTableName));
    }

    #[test]
    fn test_event_deserialize_rejects_empty_table_name() {
        let err = serde_json::from_value::<Event>(json!({"table_name": "", "data": 1}))
            .unwrap_err();
        assert!(
            err.to_string().contains("table name must not be empty"),
            "Unexpected error: {err}"
        );
    }

    #[test]
    fn test_payload_round_trip() {
        let payloads = [
            json!({"nested": {"list": [1, 2.5, "three", null, true]}}),
            json!([{"a": 1}, [], {}]),
            json!("plain string"),
            json!(42),
            json!(-0.125),
            json!(false),
            json!(null),
        ];
        for payload in payloads {
            let event = Event::new("t", payload.clone()).unwrap();
            let encoded = serde_json::to_vec(&event).unwrap();
            let decoded: Event = serde_json::from_slice(&encoded).unwrap();
            assert_eq!(decoded.data(), &payload);
            assert_eq!(decoded.table_name(), "t");
        }
    }

    #[test]
    fn test_typed_payload() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Click {
            user_id: u64,
            target: String,
        }

        let event = Event::new(
            "clicks",
            Click {
                user_id: 7,
                target: "buy".to_string(),
            },
        )
        .unwrap();
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"table_name": "clicks", "data": {"user_id": 7, "target": "buy"}})
        );
        let decoded: Event<Click> = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_batch_request_preserves_order() {
        let events = vec![
            Event::new("a", json!(0)).unwrap(),
            Event::new("b", json!(1)).unwrap(),
            Event::new("c", json!(2)).unwrap(),
        ];
        let body = serde_json::to_value(BatchRequest { events: &events }).unwrap();
        assert_eq!(
            body,
            json!({"events": [
                {"table_name": "a", "data": 0},
                {"table_name": "b", "data": 1},
                {"table_name": "c", "data": 2},
            ]})
        );
    }

    #[test]
    fn test_batch_response_integer_keys() {
        let response: BatchResponse =
            serde_json::from_str(r#"{"errors":{"0":"invalid data","12":"too large"}}"#).unwrap();
        let errors = response.errors.unwrap();
        assert_eq!(errors.get(&0).map(String::as_str), Some("invalid data"));
        assert_eq!(errors.get(&12).map(String::as_str), Some("too large"));
    }

    #[test]
    fn test_batch_response_missing_or_null_errors() {
        let response: BatchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.errors.is_none());
        let response: BatchResponse = serde_json::from_str(r#"{"errors":null}"#).unwrap();
        assert!(response.errors.is_none());
    }

    #[test]
    fn test_batch_response_rejects_negative_index() {
        let result = serde_json::from_str::<BatchResponse>(r#"{"errors":{"-1":"bad"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_error_response_requires_error_field() {
        let response: ErrorResponse = serde_json::from_str(r#"{"error":"invalid data"}"#).unwrap();
        assert_eq!(response.error, "invalid data");
        assert!(serde_json::from_str::<ErrorResponse>("{}").is_err());
    }
}
