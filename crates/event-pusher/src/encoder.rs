// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;

use crate::constants::CONTENT_TYPE_JSON;
use crate::errors::EncodeError;
use crate::event::Event;

/// Serializes a batch of events into a request body.
pub trait Encoder: Send + Sync {
    fn encode(&self, events: &[Event]) -> Result<Vec<u8>, EncodeError>;

    /// Value sent in the `Content-Type` header alongside the encoded body.
    fn content_type(&self) -> &str {
        CONTENT_TYPE_JSON
    }
}

#[derive(Serialize)]
struct Payload<'a> {
    events: &'a [Event],
}

/// Default encoder: `{"events": [...]}` as compact JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(&self, events: &[Event]) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_json::to_vec(&Payload { events })?)
    }
}
