// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of encoded batches.
//!
//! The pusher only needs "send these bytes, tell me whether it worked". [`HttpTransport`] is the
//! default implementation: an HTTP POST through reqwest, where anything other than a 2xx answer
//! is a failure. Implementations own their deadlines; the pusher never cancels a send.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use tracing::{debug, error};

use crate::errors::ShippingError;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends an encoded batch to `endpoint`.
    async fn send(
        &self,
        endpoint: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), ShippingError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    compression_level: Option<i32>,
}

impl HttpTransport {
    /// Builds a transport with a per-request `timeout`, an optional HTTPS proxy, and optional
    /// zstd compression of request bodies.
    ///
    /// An invalid proxy is logged and ignored so events can still be shipped directly.
    #[must_use]
    pub fn new(
        timeout: Duration,
        https_proxy: Option<String>,
        compression_level: Option<i32>,
    ) -> Self {
        let client = match build_client(timeout, https_proxy) {
            Ok(client) => client,
            Err(e) => {
                error!("Unable to configure HTTP client, falling back to defaults: {e}");
                reqwest::Client::new()
            }
        };
        Self {
            client,
            compression_level,
        }
    }

    fn compress(&self, body: Vec<u8>) -> Result<(Vec<u8>, bool), ShippingError> {
        let Some(level) = self.compression_level else {
            return Ok((body, false));
        };
        let mut encoder = zstd::stream::write::Encoder::new(Vec::new(), level)
            .map_err(|e| ShippingError::Payload(format!("failed to create zstd encoder: {e}")))?;
        encoder
            .write_all(&body)
            .map_err(|e| ShippingError::Payload(format!("failed to compress payload: {e}")))?;
        let compressed = encoder
            .finish()
            .map_err(|e| ShippingError::Payload(format!("failed to compress payload: {e}")))?;
        Ok((compressed, true))
    }
}

fn build_client(
    timeout: Duration,
    https_proxy: Option<String>,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(timeout);
    if let Some(proxy) = https_proxy {
        builder = builder.proxy(reqwest::Proxy::https(proxy)?);
    }
    builder.build()
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        endpoint: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), ShippingError> {
        let (body, compressed) = self.compress(body)?;

        let mut request = self.client.post(endpoint).header(CONTENT_TYPE, content_type);
        if compressed {
            request = request.header(CONTENT_ENCODING, "zstd");
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| ShippingError::Destination(e.status(), e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!("Collector accepted events with status {status}");
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(ShippingError::Destination(Some(status), text))
    }
}
