// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch strategies
//!
//! Every strategy funnels into `deliver`, the serial per-event listener loop:
//! - `SynchronousDispatcher` - the caller's thread, the reference semantics
//! - `PriorityDispatcher` - re-sorts listeners before delivering
//! - `ThreadedDispatcher` - a worker per call, degrading to synchronous at the cap
//! - `QueuedDispatcher` - enqueue now, deliver in batches later
//! - `AsyncEventDispatcher` - tokio, bounded by a semaphore

mod concurrent;
mod queued;
mod sync;
mod threaded;

pub use concurrent::AsyncEventDispatcher;
pub use queued::QueuedDispatcher;
pub use sync::{PriorityDispatcher, SynchronousDispatcher};
pub use threaded::ThreadedDispatcher;

use crate::error::{panic_message, BusError};
use crate::event::{Event, EventResult};
use crate::listener::EventListener;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A pluggable invocation strategy
pub trait EventDispatcher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Deliver `event` to `listeners`. Listener faults never escape.
    fn dispatch(&self, event: &Arc<Event>, listeners: &[Arc<dyn EventListener>]) -> EventResult;

    fn stats(&self) -> DispatcherStats;
}

/// Cumulative dispatcher counters
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DispatcherStats {
    /// Events whose listener chain ran to completion
    pub events_dispatched: u64,
    pub listeners_notified: u64,
    /// Events that ended with `EventResult::Error`
    pub errors: u64,
    /// Events accepted into a queue
    pub events_queued: u64,
    /// Events evicted from a full queue
    pub events_dropped: u64,
    /// Threaded calls that ran on the caller because the pool was full
    pub sync_fallbacks: u64,
    #[serde(with = "humantime_serde")]
    pub total_time: Duration,
}

/// Result of one pass over a listener chain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Delivery {
    pub result: EventResult,
    pub notified: usize,
}

/// Deliver an event to listeners in the given order
///
/// Cancellation and consumption are checked before each listener. A
/// terminal result stops the pass; `Handled` is remembered. Listener panics
/// are caught and recorded on the event.
pub(crate) fn deliver(event: &Event, listeners: &[Arc<dyn EventListener>]) -> Delivery {
    let mut outcome = EventResult::Continue;
    let mut notified = 0;

    for listener in listeners {
        if event.is_cancelled() || event.result().is_terminal() {
            break;
        }

        let listener_id = listener.listener_id();
        let result = match panic::catch_unwind(AssertUnwindSafe(|| listener.handle_event(event))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(
                    %listener_id,
                    event_type = %event.event_type(),
                    %message,
                    "listener panicked"
                );
                event.set_error(BusError::Listener {
                    listener_id: listener_id.to_string(),
                    message,
                });
                EventResult::Error
            }
        };
        notified += 1;
        event.mark_processed_by(listener_id);

        match result {
            EventResult::Continue => {}
            EventResult::Handled => {
                event.mark_handled();
                outcome = outcome.max(EventResult::Handled);
            }
            EventResult::Consumed => {
                event.consume();
                outcome = outcome.max(result);
                break;
            }
            EventResult::Cancelled => {
                event.cancel(None);
                outcome = outcome.max(result);
                break;
            }
            EventResult::Error => {
                if !event.has_error() {
                    event.set_error(BusError::Listener {
                        listener_id: listener_id.to_string(),
                        message: "listener reported an error".to_string(),
                    });
                }
                outcome = outcome.max(result);
                break;
            }
        }
    }

    Delivery {
        result: outcome.max(event.result()),
        notified,
    }
}

/// Shared, lock-protected `DispatcherStats`
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    stats: Mutex<DispatcherStats>,
}

impl StatsRecorder {
    fn update(&self, f: impl FnOnce(&mut DispatcherStats)) {
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut stats);
    }

    pub(crate) fn record(&self, delivery: Delivery, elapsed: Duration) {
        self.update(|stats| {
            stats.events_dispatched += 1;
            stats.listeners_notified += delivery.notified as u64;
            if delivery.result == EventResult::Error {
                stats.errors += 1;
            }
            stats.total_time += elapsed;
        });
    }

    pub(crate) fn record_queued(&self, dropped: bool) {
        self.update(|stats| {
            stats.events_queued += 1;
            if dropped {
                stats.events_dropped += 1;
            }
        });
    }

    pub(crate) fn record_fallback(&self) {
        self.update(|stats| stats.sync_fallbacks += 1);
    }

    pub(crate) fn snapshot(&self) -> DispatcherStats {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Deliver on the current thread and record the pass
pub(crate) fn deliver_recorded(
    stats: &StatsRecorder,
    event: &Event,
    listeners: &[Arc<dyn EventListener>],
) -> EventResult {
    let started = Instant::now();
    let delivery = deliver(event, listeners);
    stats.record(delivery, started.elapsed());
    delivery.result
}
