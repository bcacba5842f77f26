// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::EncodeError;

/// A unit of telemetry: a set of named fields serialized as a JSON object.
///
/// Events are moved into the pusher and owned by it until they are either delivered or re-queued.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Event(Map<String, Value>);

impl Event {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing any previous value.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Builds an event from any record that serializes to a JSON object.
    pub fn from_serialize<T: Serialize>(record: &T) -> Result<Self, EncodeError> {
        match serde_json::to_value(record)? {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(EncodeError::Custom(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Event {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Conversion from a producer's own record into an [`Event`].
///
/// The conversion cannot fail: `push` has no way to report an error back to the producer.
pub trait ToEvent {
    fn to_event(&self) -> Event;
}

impl ToEvent for Event {
    fn to_event(&self) -> Event {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Click {
        button: &'static str,
        count: u32,
    }

    #[test]
    fn test_with_field_serializes_as_object() {
        let event = Event::new()
            .with_field("event", "log")
            .with_field("timestamp", 42);

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "log", "timestamp": 42})
        );
    }

    #[test]
    fn test_from_serialize_struct() {
        let event = Event::from_serialize(&Click {
            button: "left",
            count: 2,
        })
        .unwrap();

        assert_eq!(event.get("button"), Some(&json!("left")));
        assert_eq!(event.get("count"), Some(&json!(2)));
        assert_eq!(event.len(), 2);
    }

    #[test]
    fn test_from_serialize_rejects_non_objects() {
        let result = Event::from_serialize(&vec![1, 2, 3]);
        assert!(matches!(result, Err(EncodeError::Custom(_))));
    }
}
