// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::event::Event;

/// Events accumulated between two flushes.
///
/// The buffer never holds more than `capacity` events. Handing it to a flush goes through
/// [`Batch::take`], which leaves an empty buffer behind so the consumer can keep going while the
/// taken events are owned by the flush.
#[derive(Debug)]
pub struct Batch {
    capacity: usize,
    events: Vec<Event>,
}

impl Batch {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            events: Vec::with_capacity(capacity),
        }
    }

    /// Appends `event`. Returns `true` once the batch has reached its capacity.
    ///
    /// A full batch must be taken before pushing again; extra events are handed back as `Err`.
    pub fn push(&mut self, event: Event) -> Result<bool, Event> {
        if self.is_full() {
            return Err(event);
        }
        self.events.push(event);
        Ok(self.is_full())
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.events.len() >= self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Moves the buffered events out, leaving a fresh empty batch with the same capacity.
    pub fn take(&mut self) -> Vec<Event> {
        std::mem::replace(&mut self.events, Vec::with_capacity(self.capacity))
    }
}
