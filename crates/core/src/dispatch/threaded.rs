// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-per-call dispatcher with synchronous fallback at the cap

use super::{deliver_recorded, DispatcherStats, EventDispatcher, StatsRecorder};
use crate::event::{Event, EventResult};
use crate::listener::EventListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Pool {
    in_flight: AtomicUsize,
    idle_lock: Mutex<()>,
    idle: Condvar,
}

/// Releases a worker slot when the worker finishes
struct Slot(Arc<Pool>);

impl Drop for Slot {
    fn drop(&mut self) {
        let _guard = self.0.idle_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.0.idle.notify_all();
    }
}

/// Spawns one worker thread per dispatch, up to `max_threads` in flight
///
/// Spawned calls are fire-and-forget and return `Continue`; the real outcome
/// is visible on the event and through bus hooks. When every slot is busy
/// the call runs on the caller's thread instead of blocking or dropping.
#[derive(Debug)]
pub struct ThreadedDispatcher {
    max_threads: usize,
    pool: Arc<Pool>,
    stats: Arc<StatsRecorder>,
}

impl ThreadedDispatcher {
    pub fn new(max_threads: usize) -> Self {
        Self {
            max_threads,
            pool: Arc::new(Pool::default()),
            stats: Arc::new(StatsRecorder::default()),
        }
    }

    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    /// Workers currently running
    pub fn in_flight(&self) -> usize {
        self.pool.in_flight.load(Ordering::SeqCst)
    }

    /// Block until no worker is running; false if `timeout` elapsed first
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.pool.idle_lock.lock().unwrap_or_else(|e| e.into_inner());
        while self.in_flight() > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = match self.pool.idle.wait_timeout(guard, deadline - now) {
                Ok((guard, _)) => guard,
                Err(e) => e.into_inner().0,
            };
        }
        true
    }

    fn try_reserve(&self) -> Option<Slot> {
        self.pool
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max_threads).then_some(n + 1)
            })
            .ok()
            .map(|_| Slot(Arc::clone(&self.pool)))
    }
}

impl Default for ThreadedDispatcher {
    fn default() -> Self {
        Self::new(4)
    }
}

impl EventDispatcher for ThreadedDispatcher {
    fn name(&self) -> &'static str {
        "threaded"
    }

    fn dispatch(&self, event: &Arc<Event>, listeners: &[Arc<dyn EventListener>]) -> EventResult {
        let Some(slot) = self.try_reserve() else {
            tracing::debug!(
                event_type = %event.event_type(),
                max_threads = self.max_threads,
                "worker pool full, dispatching on caller"
            );
            self.stats.record_fallback();
            return deliver_recorded(&self.stats, event, listeners);
        };

        let worker_event = Arc::clone(event);
        let worker_listeners = listeners.to_vec();
        let stats = Arc::clone(&self.stats);
        let spawned = std::thread::Builder::new()
            .name("tidings-dispatch".to_string())
            .spawn(move || {
                let _slot = slot;
                deliver_recorded(&stats, &worker_event, &worker_listeners);
            });

        match spawned {
            Ok(_) => EventResult::Continue,
            Err(e) => {
                // the closure (and its slot) was dropped with the failed spawn
                tracing::warn!(error = %e, "failed to spawn dispatch worker, dispatching on caller");
                self.stats.record_fallback();
                deliver_recorded(&self.stats, event, listeners)
            }
        }
    }

    fn stats(&self) -> DispatcherStats {
        self.stats.snapshot()
    }
}
