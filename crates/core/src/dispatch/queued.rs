// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deferred dispatcher: enqueue on dispatch, deliver on `process_queue`

use super::{deliver_recorded, DispatcherStats, EventDispatcher, StatsRecorder};
use crate::event::{Event, EventResult};
use crate::listener::EventListener;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

struct Pending {
    event: Arc<Event>,
    listeners: Vec<Arc<dyn EventListener>>,
}

/// Bounded FIFO of (event, listeners) pairs; the oldest entry is evicted
/// when the queue is full
pub struct QueuedDispatcher {
    max_queue_size: usize,
    batch_size: usize,
    queue: Mutex<VecDeque<Pending>>,
    stats: StatsRecorder,
}

impl QueuedDispatcher {
    pub fn new(max_queue_size: usize, batch_size: usize) -> Self {
        Self {
            max_queue_size,
            batch_size,
            queue: Mutex::new(VecDeque::new()),
            stats: StatsRecorder::default(),
        }
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Pending>> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn queue_len(&self) -> usize {
        self.queue().len()
    }

    /// Deliver up to `max_events` (default: `batch_size`) oldest-first
    ///
    /// Returns the number of events delivered.
    pub fn process_queue(&self, max_events: Option<usize>) -> usize {
        let limit = max_events.unwrap_or(self.batch_size);
        let mut processed = 0;
        while processed < limit {
            // the lock is released before delivery so listeners may enqueue
            let Some(pending) = self.queue().pop_front() else {
                break;
            };
            deliver_recorded(&self.stats, &pending.event, &pending.listeners);
            processed += 1;
        }
        processed
    }

    pub fn clear(&self) -> usize {
        let mut queue = self.queue();
        let cleared = queue.len();
        queue.clear();
        cleared
    }
}

impl Default for QueuedDispatcher {
    fn default() -> Self {
        Self::new(1000, 100)
    }
}

impl EventDispatcher for QueuedDispatcher {
    fn name(&self) -> &'static str {
        "queued"
    }

    fn dispatch(&self, event: &Arc<Event>, listeners: &[Arc<dyn EventListener>]) -> EventResult {
        let mut queue = self.queue();
        let mut dropped = false;
        while queue.len() >= self.max_queue_size {
            let Some(evicted) = queue.pop_front() else {
                break;
            };
            dropped = true;
            tracing::warn!(
                event_type = %evicted.event.event_type(),
                trace_id = %evicted.event.trace_id(),
                "dispatch queue full, dropping oldest event"
            );
        }
        if self.max_queue_size > 0 {
            queue.push_back(Pending {
                event: Arc::clone(event),
                listeners: listeners.to_vec(),
            });
        } else {
            dropped = true;
        }
        drop(queue);
        self.stats.record_queued(dropped);
        EventResult::Continue
    }

    fn stats(&self) -> DispatcherStats {
        self.stats.snapshot()
    }
}

impl fmt::Debug for QueuedDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedDispatcher")
            .field("max_queue_size", &self.max_queue_size)
            .field("batch_size", &self.batch_size)
            .field("queued", &self.queue_len())
            .finish()
    }
}
