// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Time between two timer-triggered flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum number of events sent in a single request.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Capacity of the pending queue. Producers block once it is full.
pub const DEFAULT_QUEUE_SIZE: usize = 4080;

/// Deadline applied by the HTTP transport to each request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const CONTENT_TYPE_JSON: &str = "application/json";
