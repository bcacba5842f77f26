// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::fmt::{self, Debug};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL, DEFAULT_QUEUE_SIZE, DEFAULT_TIMEOUT,
};
use crate::encoder::{Encoder, JsonEncoder};
use crate::transport::{HttpTransport, Transport};

/// Configuration of a [`crate::Pusher`].
///
/// Every field is optional: zero or unset values are replaced by the defaults in
/// [`crate::constants`] when the pusher initializes, which happens exactly once.
#[derive(Clone, Default)]
pub struct PusherConfig {
    /// Where batches are posted. Empty disables delivery: flushes succeed without sending.
    pub endpoint: String,
    /// Time between two timer-triggered flushes.
    pub flush_interval: Duration,
    /// Maximum number of events sent at once.
    pub batch_size: usize,
    /// Capacity of the pending queue.
    pub queue_size: usize,
    /// Request deadline of the default HTTP transport.
    pub timeout: Duration,
    /// HTTPS proxy of the default HTTP transport.
    pub https_proxy: Option<String>,
    /// zstd level used by the default HTTP transport. `None` sends uncompressed bodies.
    pub compression_level: Option<i32>,
    pub transport: Option<Arc<dyn Transport>>,
    pub encoder: Option<Arc<dyn Encoder>>,
}

impl Debug for PusherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PusherConfig")
            .field("endpoint", &self.endpoint)
            .field("flush_interval", &self.flush_interval)
            .field("batch_size", &self.batch_size)
            .field("queue_size", &self.queue_size)
            .field("timeout", &self.timeout)
            .field("https_proxy", &self.https_proxy)
            .field("compression_level", &self.compression_level)
            .field("transport", &self.transport.as_ref().map(|_| "custom"))
            .field("encoder", &self.encoder.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl PusherConfig {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Reads the configuration from `EVENTS_*` environment variables.
    ///
    /// Values that do not parse are logged and left unset, so they fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let endpoint = env::var("EVENTS_ENDPOINT").unwrap_or_default();
        let flush_interval = parse_env::<u64>("EVENTS_FLUSH_INTERVAL")
            .map(Duration::from_secs)
            .unwrap_or_default();
        let batch_size = parse_env::<usize>("EVENTS_BATCH_SIZE").unwrap_or_default();
        let queue_size = parse_env::<usize>("EVENTS_QUEUE_SIZE").unwrap_or_default();
        let timeout = parse_env::<u64>("EVENTS_TIMEOUT")
            .map(Duration::from_secs)
            .unwrap_or_default();
        let https_proxy = env::var("EVENTS_PROXY_HTTPS")
            .or_else(|_| env::var("HTTPS_PROXY"))
            .ok()
            .filter(|proxy| !proxy.trim().is_empty());
        let compression_level = parse_env::<i32>("EVENTS_COMPRESSION_LEVEL");

        Self {
            endpoint,
            flush_interval,
            batch_size,
            queue_size,
            timeout,
            https_proxy,
            compression_level,
            transport: None,
            encoder: None,
        }
    }

    #[must_use]
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_https_proxy(mut self, https_proxy: impl Into<String>) -> Self {
        self.https_proxy = Some(https_proxy.into());
        self
    }

    #[must_use]
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = Some(level);
        self
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn with_encoder(mut self, encoder: Arc<dyn Encoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub(crate) fn resolve(self) -> Settings {
        let timeout = non_zero_duration(self.timeout, DEFAULT_TIMEOUT);
        let transport = self.transport.unwrap_or_else(|| {
            Arc::new(HttpTransport::new(
                timeout,
                self.https_proxy,
                self.compression_level,
            ))
        });

        Settings {
            endpoint: self.endpoint,
            flush_interval: non_zero_duration(self.flush_interval, DEFAULT_FLUSH_INTERVAL),
            batch_size: non_zero(self.batch_size, DEFAULT_BATCH_SIZE),
            queue_size: non_zero(self.queue_size, DEFAULT_QUEUE_SIZE),
            transport,
            encoder: self.encoder.unwrap_or_else(|| Arc::new(JsonEncoder)),
        }
    }
}

/// Configuration with every default applied.
#[derive(Clone)]
pub(crate) struct Settings {
    pub(crate) endpoint: String,
    pub(crate) flush_interval: Duration,
    pub(crate) batch_size: usize,
    pub(crate) queue_size: usize,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) encoder: Arc<dyn Encoder>,
}

fn non_zero(value: usize, default: usize) -> usize {
    if value == 0 {
        default
    } else {
        value
    }
}

fn non_zero_duration(value: Duration, default: Duration) -> Duration {
    if value.is_zero() {
        default
    } else {
        value
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("{name} has an invalid value '{raw}', using the default");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tracing_test::traced_test;

    const VARS: [&str; 8] = [
        "EVENTS_ENDPOINT",
        "EVENTS_FLUSH_INTERVAL",
        "EVENTS_BATCH_SIZE",
        "EVENTS_QUEUE_SIZE",
        "EVENTS_TIMEOUT",
        "EVENTS_PROXY_HTTPS",
        "EVENTS_COMPRESSION_LEVEL",
        "HTTPS_PROXY",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_resolve_applies_defaults() {
        let settings = PusherConfig::default().resolve();

        assert_eq!(settings.endpoint, "");
        assert_eq!(settings.flush_interval, Duration::from_secs(30));
        assert_eq!(settings.batch_size, 50);
        assert_eq!(settings.queue_size, 4080);
        assert_eq!(settings.encoder.content_type(), "application/json");
    }

    #[test]
    fn test_resolve_keeps_explicit_values() {
        let settings = PusherConfig::new("http://collector/events")
            .with_flush_interval(Duration::from_secs(5))
            .with_batch_size(10)
            .with_queue_size(20)
            .resolve();

        assert_eq!(settings.endpoint, "http://collector/events");
        assert_eq!(settings.flush_interval, Duration::from_secs(5));
        assert_eq!(settings.batch_size, 10);
        assert_eq!(settings.queue_size, 20);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        env::set_var("EVENTS_ENDPOINT", "https://collector.example.com/events");
        env::set_var("EVENTS_FLUSH_INTERVAL", "10");
        env::set_var("EVENTS_BATCH_SIZE", "25");
        env::set_var("EVENTS_QUEUE_SIZE", "100");
        env::set_var("EVENTS_TIMEOUT", "3");
        env::set_var("HTTPS_PROXY", "http://proxy:3128");
        env::set_var("EVENTS_COMPRESSION_LEVEL", "6");

        let config = PusherConfig::from_env();

        assert_eq!(config.endpoint, "https://collector.example.com/events");
        assert_eq!(config.flush_interval, Duration::from_secs(10));
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.queue_size, 100);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.https_proxy.as_deref(), Some("http://proxy:3128"));
        assert_eq!(config.compression_level, Some(6));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_prefers_events_proxy() {
        clear_env();
        env::set_var("EVENTS_PROXY_HTTPS", "http://events-proxy:3128");
        env::set_var("HTTPS_PROXY", "http://proxy:3128");

        let config = PusherConfig::from_env();

        assert_eq!(
            config.https_proxy.as_deref(),
            Some("http://events-proxy:3128")
        );
        clear_env();
    }

    #[test]
    #[serial]
    #[traced_test]
    fn test_from_env_invalid_values_fall_back_to_defaults() {
        clear_env();
        env::set_var("EVENTS_BATCH_SIZE", "lots");
        env::set_var("EVENTS_FLUSH_INTERVAL", "-1");

        let settings = PusherConfig::from_env().resolve();

        assert_eq!(settings.batch_size, 50);
        assert_eq!(settings.flush_interval, Duration::from_secs(30));
        assert!(logs_contain("EVENTS_BATCH_SIZE has an invalid value"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_unset() {
        clear_env();

        let config = PusherConfig::from_env();

        assert!(config.endpoint.is_empty());
        assert_eq!(config.batch_size, 0);
        assert!(config.https_proxy.is_none());
        assert!(config.compression_level.is_none());
    }
}
