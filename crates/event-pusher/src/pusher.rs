// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded, batching event pipeline.
//!
//! ```text
//!   producers ──push──▶ pending queue ──▶ consumer loop ──▶ batch
//!                          ▲                                  │ full or tick
//!                          │                                  ▼
//!                          └──── requeue on failure ◀──── flush task (one per batch)
//! ```
//!
//! The pending queue is a bounded channel: producers wait once it is full instead of dropping
//! events. A single consumer loop moves events into the current batch and hands the batch to a
//! detached flush task when it reaches `batch_size` or when the flush interval ticks. A flush
//! task owns its batch outright, so concurrent flushes need no locking. Events of a failed batch
//! are pushed back into the queue.
//!
//! Closing the pusher cancels the loop, closes the queue, and flushes the current batch together
//! with everything still queued. That terminal flush does not re-queue: its failures are logged
//! and the events are dropped.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use crate::batch::Batch;
use crate::config::PusherConfig;
use crate::event::Event;
use crate::flusher::{FlushMode, Flusher};

/// Lifecycle of a [`Pusher`]. States only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PusherState {
    /// Configured, but neither `push`, `start` nor `close` has been called yet.
    Uninitialized = 0,
    /// Defaults are resolved and the pending queue exists. Events can be queued.
    Initialized = 1,
    /// The consumer loop is running.
    Running = 2,
    /// Shutdown was requested and remaining events are being flushed.
    Draining = 3,
    /// Every accepted event has been attempted. Nothing will be flushed anymore.
    Stopped = 4,
}

impl PusherState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Uninitialized,
            1 => Self::Initialized,
            2 => Self::Running,
            3 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

/// Handle to an event pipeline. Cloning it is cheap and every clone feeds the same queue.
///
/// A pusher is created explicitly and handed to its producers; there is no process-wide
/// instance. Call [`Pusher::close`] before dropping the last handle, otherwise queued events are
/// never flushed.
#[derive(Clone)]
pub struct Pusher {
    shared: Arc<Shared>,
}

struct Shared {
    config: PusherConfig,
    state: AtomicU8,
    queue: OnceLock<Queue>,
    cancel_token: CancellationToken,
    stopped: CancellationToken,
    flushes: TaskTracker,
}

/// Everything created by the one-time initialization.
struct Queue {
    flush_interval: Duration,
    batch_size: usize,
    tx: mpsc::Sender<Event>,
    rx: Mutex<Option<mpsc::Receiver<Event>>>,
    flusher: Flusher,
}

impl Queue {
    fn take_receiver(&self) -> Option<mpsc::Receiver<Event>> {
        self.rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Pusher {
    #[must_use]
    pub fn new(config: PusherConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: AtomicU8::new(PusherState::Uninitialized as u8),
                queue: OnceLock::new(),
                cancel_token: CancellationToken::new(),
                stopped: CancellationToken::new(),
                flushes: TaskTracker::new(),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> PusherState {
        self.shared.state()
    }

    /// Starts the consumer loop on the current Tokio runtime.
    ///
    /// Only the first call has an effect, whether calls are sequential or concurrent. Calling it
    /// after [`Pusher::close`] does nothing.
    pub fn start(&self) {
        let Ok(runtime) = Handle::try_current() else {
            error!("Pusher must be started from within a Tokio runtime");
            return;
        };

        let queue = self.shared.queue();
        if !self
            .shared
            .transition(PusherState::Initialized, PusherState::Running)
        {
            return;
        }
        let Some(rx) = queue.take_receiver() else {
            return;
        };

        debug!(
            "Starting event pusher: batch_size={}, flush_interval={:?}",
            queue.batch_size, queue.flush_interval
        );
        let shared = Arc::clone(&self.shared);
        runtime.spawn(async move { shared.run(rx).await });
    }

    /// Queues `event` for delivery.
    ///
    /// Returns as soon as the event is queued. When the queue is full this waits for room, which
    /// is how a slow or failing collector slows producers down. After [`Pusher::close`] the event
    /// is dropped with a warning instead.
    pub async fn push(&self, event: Event) {
        if self.shared.queue().tx.send(event).await.is_err() {
            warn!("Pusher is closed, dropping event");
        }
    }

    /// Same as [`Pusher::push`], for producers running on plain threads or in `spawn_blocking`.
    ///
    /// # Panics
    ///
    /// Panics when called from an asynchronous context; use [`Pusher::push`] there.
    pub fn push_blocking(&self, event: Event) {
        if self.shared.queue().tx.blocking_send(event).is_err() {
            warn!("Pusher is closed, dropping event");
        }
    }

    /// Stops the pusher once every accepted event has been attempted.
    ///
    /// The current batch and every event still queued are flushed once more without re-queueing,
    /// and flushes that were already running are awaited. Producers waiting on a full queue are
    /// released and their events dropped. Calling `close` again, or from several tasks, waits for
    /// the same shutdown.
    ///
    /// Flushes that are in flight are awaited, so `close` takes as long as the slowest of them:
    /// it is bounded by the [`crate::Transport`]'s own deadline, not by the pusher.
    pub async fn close(&self) {
        let queue = self.shared.queue();

        // Never started: drain the queue from here.
        if self
            .shared
            .transition(PusherState::Initialized, PusherState::Draining)
        {
            if let Some(rx) = queue.take_receiver() {
                self.shared.drain(rx, Batch::new(queue.batch_size)).await;
            }
            self.shared.finish();
            return;
        }

        self.shared.cancel_token.cancel();
        self.shared.stopped.cancelled().await;
    }
}

impl Shared {
    fn state(&self) -> PusherState {
        PusherState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: PusherState, to: PusherState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Resolves the configuration and allocates the queue on first use.
    ///
    /// Exactly one caller runs the initialization; every other caller waits for it and observes
    /// the same queue.
    fn queue(&self) -> &Queue {
        self.queue.get_or_init(|| {
            let settings = self.config.clone().resolve();
            let (tx, rx) = mpsc::channel(settings.queue_size);
            let flusher = Flusher::new(
                settings.endpoint,
                settings.encoder,
                settings.transport,
                tx.clone(),
            );
            let queue = Queue {
                flush_interval: settings.flush_interval,
                batch_size: settings.batch_size,
                tx,
                rx: Mutex::new(Some(rx)),
                flusher,
            };
            self.transition(PusherState::Uninitialized, PusherState::Initialized);
            queue
        })
    }

    fn finish(&self) {
        self.state.store(PusherState::Stopped as u8, Ordering::Release);
        self.stopped.cancel();
        debug!("Event pusher stopped");
    }

    async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<Event>) {
        let queue = self.queue();
        let mut ticker = interval_at(Instant::now() + queue.flush_interval, queue.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut batch = Batch::new(queue.batch_size);

        loop {
            tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => break,
                _ = ticker.tick() => self.dispatch(batch.take()),
                Some(event) = rx.recv() => self.append(&mut batch, event),
            }
        }

        self.transition(PusherState::Running, PusherState::Draining);
        self.drain(rx, batch).await;
        self.finish();
    }

    fn append(&self, batch: &mut Batch, event: Event) {
        match batch.push(event) {
            Ok(false) => {}
            Ok(true) => self.dispatch(batch.take()),
            Err(event) => {
                self.dispatch(batch.take());
                self.append(batch, event);
            }
        }
    }

    /// Hands `events` to a detached flush task. There is no bound on concurrent flushes.
    fn dispatch(&self, events: Vec<Event>) {
        if events.is_empty() {
            return;
        }
        let flusher = self.queue().flusher.clone();
        self.flushes.spawn(async move {
            // Failures are logged and re-queued by the flusher.
            let _ = flusher.flush(events, FlushMode::RequeueOnError).await;
        });
    }

    async fn drain(&self, mut rx: mpsc::Receiver<Event>, mut batch: Batch) {
        let queue = self.queue();
        rx.close();

        let mut pending = batch.take();
        while let Some(event) = rx.recv().await {
            pending.push(event);
        }
        debug!("Draining {} events", pending.len());

        while !pending.is_empty() {
            let rest = pending.split_off(pending.len().min(queue.batch_size));
            // Terminal attempt: the flusher logs failures and drops the events.
            let _ = queue.flusher.flush(pending, FlushMode::NoRequeue).await;
            pending = rest;
        }

        self.flushes.close();
        self.flushes.wait().await;
    }
}
