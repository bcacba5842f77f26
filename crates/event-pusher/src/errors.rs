// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for the event pipeline.
//!
//! None of these reach a producer: they are raised and logged inside a flush, and decide whether
//! the events of a batch go back into the pending queue.

use reqwest::StatusCode;

/// The batch could not be serialized.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to serialize events: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to encode events: {0}")]
    Custom(String),
}

/// The payload could not be delivered.
#[derive(Debug, thiserror::Error)]
pub enum ShippingError {
    /// The request could not be prepared (compression, request building).
    #[error("failed to prepare payload: {0}")]
    Payload(String),
    /// The collector was unreachable or answered with a non-success status.
    #[error("failed to ship events ({}): {1}", status_label(.0))]
    Destination(Option<StatusCode>, String),
}

fn status_label(status: &Option<StatusCode>) -> String {
    status.map_or_else(|| "no status".to_string(), |s| s.to_string())
}

/// Outcome of a failed flush. Both variants are retried the same way.
#[derive(Debug, thiserror::Error)]
pub enum FlushError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Shipping(#[from] ShippingError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_error_display_with_status() {
        let error = ShippingError::Destination(
            Some(StatusCode::SERVICE_UNAVAILABLE),
            "try again".to_string(),
        );
        assert_eq!(
            error.to_string(),
            "failed to ship events (503 Service Unavailable): try again"
        );
    }

    #[test]
    fn test_destination_error_display_without_status() {
        let error = ShippingError::Destination(None, "connection refused".to_string());
        assert_eq!(
            error.to_string(),
            "failed to ship events (no status): connection refused"
        );
    }

    #[test]
    fn test_flush_error_is_transparent() {
        let error = FlushError::from(EncodeError::Custom("bad field".to_string()));
        assert_eq!(error.to_string(), "failed to encode events: bad field");
    }
}
