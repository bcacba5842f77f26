// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::encoder::Encoder;
use crate::errors::FlushError;
use crate::event::Event;
use crate::transport::Transport;

/// What to do with the events of a batch that could not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlushMode {
    /// Terminal attempt during shutdown: failures are logged and the events dropped.
    NoRequeue,
    /// Failed events go back into the pending queue.
    RequeueOnError,
}

/// Encodes and ships batches, re-queueing them on failure.
///
/// A flusher shares nothing with the consumer loop besides the sending half of the pending
/// queue, so any number of flushes can run at the same time.
#[derive(Clone)]
pub(crate) struct Flusher {
    endpoint: String,
    encoder: Arc<dyn Encoder>,
    transport: Arc<dyn Transport>,
    requeue_tx: mpsc::Sender<Event>,
}

impl Flusher {
    pub(crate) fn new(
        endpoint: String,
        encoder: Arc<dyn Encoder>,
        transport: Arc<dyn Transport>,
        requeue_tx: mpsc::Sender<Event>,
    ) -> Self {
        Self {
            endpoint,
            encoder,
            transport,
            requeue_tx,
        }
    }

    /// Flushes `batch`. An empty batch is a no-op.
    pub(crate) async fn flush(
        &self,
        batch: Vec<Event>,
        mode: FlushMode,
    ) -> Result<(), FlushError> {
        let count = batch.len();
        if count == 0 {
            return Ok(());
        }

        debug!("Flushing {count} events");

        let Err(e) = self.ship(&batch).await else {
            return Ok(());
        };
        error!("Failed to flush {count} events: {e}");

        if mode == FlushMode::RequeueOnError {
            self.requeue(batch).await;
        }
        Err(e)
    }

    async fn ship(&self, batch: &[Event]) -> Result<(), FlushError> {
        if self.endpoint.is_empty() {
            return Ok(());
        }

        let body = self.encoder.encode(batch)?;
        self.transport
            .send(&self.endpoint, self.encoder.content_type(), body)
            .await?;
        Ok(())
    }

    /// Pushes every event of a failed batch back into the pending queue.
    ///
    /// This waits for room in the queue like any producer does. Once the queue is closed the
    /// remaining events are dropped.
    async fn requeue(&self, batch: Vec<Event>) {
        let count = batch.len();
        let mut dropped = 0;
        for event in batch {
            if self.requeue_tx.send(event).await.is_err() {
                dropped += 1;
            }
        }

        if dropped > 0 {
            warn!("Pusher is closed, dropped {dropped} of {count} failed events");
        } else {
            debug!("Re-queued {count} events");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::encoder::JsonEncoder;
    use crate::errors::{EncodeError, ShippingError};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct StubTransport {
        fail: bool,
        bodies: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn send(
            &self,
            _endpoint: &str,
            _content_type: &str,
            body: Vec<u8>,
        ) -> Result<(), ShippingError> {
            self.bodies
                .lock()
                .unwrap()
                .push(serde_json::from_slice(&body).unwrap());
            if self.fail {
                return Err(ShippingError::Destination(None, "connection refused".into()));
            }
            Ok(())
        }
    }

    struct FailingEncoder {
        calls: AtomicUsize,
    }

    impl Encoder for FailingEncoder {
        fn encode(&self, _events: &[Event]) -> Result<Vec<u8>, EncodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(EncodeError::Custom("unsupported value".into()))
        }
    }

    fn events(n: usize) -> Vec<Event> {
        (0..n).map(|i| Event::new().with_field("seq", i)).collect()
    }

    fn flusher(
        endpoint: &str,
        transport: Arc<dyn Transport>,
        encoder: Arc<dyn Encoder>,
    ) -> (Flusher, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(16);
        (Flusher::new(endpoint.to_string(), encoder, transport, tx), rx)
    }

    #[tokio::test]
    #[traced_test]
    async fn test_empty_batch_is_a_noop() {
        let transport = Arc::new(StubTransport::default());
        let (flusher, _rx) = flusher("http://collector", transport.clone(), Arc::new(JsonEncoder));

        assert!(flusher.flush(vec![], FlushMode::RequeueOnError).await.is_ok());

        assert!(transport.bodies.lock().unwrap().is_empty());
        assert!(!logs_contain("Flushing"));
    }

    #[tokio::test]
    async fn test_successful_flush_sends_payload() {
        let transport = Arc::new(StubTransport::default());
        let (flusher, mut rx) =
            flusher("http://collector", transport.clone(), Arc::new(JsonEncoder));

        assert!(flusher.flush(events(2), FlushMode::RequeueOnError).await.is_ok());

        assert_eq!(
            *transport.bodies.lock().unwrap(),
            vec![json!({"events": [{"seq": 0}, {"seq": 1}]})]
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_empty_endpoint_succeeds_without_sending() {
        let transport = Arc::new(StubTransport {
            fail: true,
            ..Default::default()
        });
        let (flusher, mut rx) = flusher("", transport.clone(), Arc::new(JsonEncoder));

        assert!(flusher.flush(events(100), FlushMode::RequeueOnError).await.is_ok());

        assert!(transport.bodies.lock().unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_transport_failure_requeues_in_order() {
        let transport = Arc::new(StubTransport {
            fail: true,
            ..Default::default()
        });
        let (flusher, mut rx) = flusher("http://collector", transport, Arc::new(JsonEncoder));

        let result = flusher.flush(events(3), FlushMode::RequeueOnError).await;

        assert!(matches!(result, Err(FlushError::Shipping(_))));
        for i in 0..3 {
            assert_eq!(rx.try_recv().unwrap().get("seq"), Some(&json!(i)));
        }
        assert!(logs_contain("Failed to flush 3 events"));
    }

    #[tokio::test]
    async fn test_terminal_failure_does_not_requeue() {
        let transport = Arc::new(StubTransport {
            fail: true,
            ..Default::default()
        });
        let (flusher, mut rx) = flusher("http://collector", transport, Arc::new(JsonEncoder));

        let result = flusher.flush(events(3), FlushMode::NoRequeue).await;

        assert!(result.is_err());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_encode_failure_requeues_without_sending() {
        let transport = Arc::new(StubTransport::default());
        let encoder = Arc::new(FailingEncoder {
            calls: AtomicUsize::new(0),
        });
        let (flusher, mut rx) = flusher("http://collector", transport.clone(), encoder.clone());

        let result = flusher.flush(events(2), FlushMode::RequeueOnError).await;

        assert!(matches!(result, Err(FlushError::Encode(_))));
        assert_eq!(encoder.calls.load(Ordering::SeqCst), 1);
        assert!(transport.bodies.lock().unwrap().is_empty());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_requeue_into_closed_queue_drops_events() {
        let transport = Arc::new(StubTransport {
            fail: true,
            ..Default::default()
        });
        let (flusher, mut rx) = flusher("http://collector", transport, Arc::new(JsonEncoder));
        rx.close();

        let result = flusher.flush(events(4), FlushMode::RequeueOnError).await;

        assert!(result.is_err());
        assert!(logs_contain("dropped 4 of 4 failed events"));
    }
}
