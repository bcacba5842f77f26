// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Non-blocking delivery of telemetry events to a remote collector.
//!
//! Producers hand [`event::Event`]s to a [`pusher::Pusher`], which queues them in a bounded
//! channel, groups them into batches, and ships each batch through a pluggable
//! [`encoder::Encoder`] and [`transport::Transport`]. A batch is flushed when it reaches the
//! configured size or when the flush interval elapses, whichever comes first. Failed batches are
//! re-queued so delivery is at-least-once, and [`pusher::Pusher::close`] drains everything that
//! was accepted before returning.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod batch;
pub mod config;
pub mod constants;
pub mod encoder;
pub mod errors;
pub mod event;
mod flusher;
pub mod logs;
pub mod pusher;
pub mod transport;

pub use config::PusherConfig;
pub use encoder::{Encoder, JsonEncoder};
pub use errors::{EncodeError, FlushError, ShippingError};
pub use event::{Event, ToEvent};
pub use pusher::{Pusher, PusherState};
pub use transport::{HttpTransport, Transport};
