// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellable one-shot timers over a `Clock`
//!
//! `Timers` only fires when pumped: tests call `fire_due` after advancing a
//! `FakeClock`, while `TimerDriver` pumps against real time on a thread.

use crate::clock::Clock;
use crate::error::panic_message;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Handle to an armed timer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

type Callback = Box<dyn FnOnce() + Send>;

#[derive(Debug, PartialEq, Eq)]
struct Deadline {
    fire_at: Instant,
    id: TimerId,
}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Min-heap: earliest first, then arming order
        Reverse((self.fire_at, self.id)).cmp(&Reverse((other.fire_at, other.id)))
    }
}

#[derive(Default)]
struct TimerState {
    deadlines: BinaryHeap<Deadline>,
    /// Armed callbacks; a deadline without an entry here was cancelled
    callbacks: HashMap<TimerId, Callback>,
    next_id: u64,
}

struct Inner {
    clock: Arc<dyn Clock>,
    state: Mutex<TimerState>,
    armed: Condvar,
}

/// Shared timer set; clones arm into the same set
#[derive(Clone)]
pub struct Timers {
    inner: Arc<Inner>,
}

impl Timers {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                clock,
                state: Mutex::new(TimerState::default()),
                armed: Condvar::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, TimerState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn now(&self) -> Instant {
        self.inner.clock.now()
    }

    /// Run `callback` once `delay` has elapsed on the clock
    pub fn arm(&self, delay: Duration, callback: impl FnOnce() + Send + 'static) -> TimerId {
        let fire_at = self.now() + delay;
        let mut state = self.state();
        let id = TimerId(state.next_id);
        state.next_id += 1;
        state.deadlines.push(Deadline { fire_at, id });
        state.callbacks.insert(id, Box::new(callback));
        drop(state);
        self.inner.armed.notify_all();
        id
    }

    /// Disarm a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&self, id: TimerId) -> bool {
        self.state().callbacks.remove(&id).is_some()
    }

    /// Fire every timer due at the current clock reading
    ///
    /// Callbacks run after the lock is released, in deadline order, so they
    /// may arm or cancel timers. Timers they arm fire on a later call.
    pub fn fire_due(&self) -> usize {
        let now = self.now();
        let due: Vec<(TimerId, Callback)> = {
            let mut state = self.state();
            let mut due = Vec::new();
            while state.deadlines.peek().is_some_and(|d| d.fire_at <= now) {
                let Some(deadline) = state.deadlines.pop() else {
                    break;
                };
                if let Some(callback) = state.callbacks.remove(&deadline.id) {
                    due.push((deadline.id, callback));
                }
            }
            due
        };

        let fired = due.len();
        for (id, callback) in due {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(callback)) {
                tracing::warn!(
                    timer = %id,
                    message = %panic_message(payload.as_ref()),
                    "timer callback panicked"
                );
            }
        }
        fired
    }

    /// Earliest deadline among armed timers
    pub fn next_deadline(&self) -> Option<Instant> {
        let mut state = self.state();
        // Cancelled deadlines at the top are dead weight
        while let Some(top) = state.deadlines.peek() {
            if state.callbacks.contains_key(&top.id) {
                return Some(top.fire_at);
            }
            state.deadlines.pop();
        }
        None
    }

    /// Number of armed timers
    pub fn pending(&self) -> usize {
        self.state().callbacks.len()
    }

    /// Block until a timer is armed or `timeout` passes, capped at the next deadline
    fn wait_for_work(&self, timeout: Duration) {
        let now = self.now();
        let wait = self
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now).min(timeout))
            .unwrap_or(timeout);
        if wait.is_zero() {
            return;
        }
        let state = self.state();
        let _ = self
            .inner
            .armed
            .wait_timeout(state, wait)
            .unwrap_or_else(|e| e.into_inner());
    }

    fn wake(&self) {
        self.inner.armed.notify_all();
    }
}

impl fmt::Debug for Timers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timers")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Background thread that pumps a `Timers` against its clock
pub struct TimerDriver {
    timers: Timers,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TimerDriver {
    /// Start pumping; `resolution` bounds how long the thread sleeps
    pub fn spawn(timers: Timers, resolution: Duration) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let timers = timers.clone();
            let stop = Arc::clone(&stop);
            std::thread::Builder::new()
                .name("tidings-timers".to_string())
                .spawn(move || {
                    while !stop.load(Ordering::Acquire) {
                        timers.fire_due();
                        timers.wait_for_work(resolution);
                    }
                })?
        };
        tracing::debug!(?resolution, "timer driver started");
        Ok(Self {
            timers,
            stop,
            handle: Some(handle),
        })
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    /// Stop the thread and wait for it to exit; pending timers stay armed
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.timers.wake();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("timer driver thread panicked");
            }
            tracing::debug!("timer driver stopped");
        }
    }
}

impl Drop for TimerDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
