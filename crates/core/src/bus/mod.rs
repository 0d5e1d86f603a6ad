// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus: registry, filters, hooks, a bounded queue and statistics
//!
//! All state sits behind one lock. Filters, hooks and listeners are cloned
//! out under the lock and invoked after it is released, so a listener can
//! dispatch, register or unregister on the same bus.

mod stats;

pub use stats::BusStats;

use crate::config::BusConfig;
use crate::dispatch::{deliver, Delivery};
use crate::error::{panic_message, BusError};
use crate::event::{Event, EventResult};
use crate::listener::{EventListener, ListenerRegistry};
use stats::StatsLedger;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Decides whether an event may proceed; `false` blocks it
pub type EventFilter = Arc<dyn Fn(&Event) -> bool + Send + Sync>;
/// Runs before listeners see an event
pub type PreDispatchHook = Arc<dyn Fn(&Event) + Send + Sync>;
/// Runs after the listener chain with its result
pub type PostDispatchHook = Arc<dyn Fn(&Event, EventResult) + Send + Sync>;

struct BusState {
    enabled: bool,
    shut_down: bool,
    registry: ListenerRegistry,
    queue: VecDeque<Arc<Event>>,
    filters: Vec<EventFilter>,
    pre_hooks: Vec<PreDispatchHook>,
    post_hooks: Vec<PostDispatchHook>,
    ledger: StatsLedger,
}

struct Shared {
    config: BusConfig,
    state: Mutex<BusState>,
}

/// How a single dispatch ended
enum Outcome {
    Disabled,
    Invalid(Vec<String>),
    Filtered,
    Queued,
    Processed(Delivery),
}

/// Cheap-to-clone handle to one bus; clones share state
#[derive(Clone)]
pub struct EventBus {
    shared: Arc<Shared>,
}

impl EventBus {
    pub fn new(config: BusConfig) -> Result<Self, BusError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: BusConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(BusState {
                    enabled: true,
                    shut_down: false,
                    registry: ListenerRegistry::new(),
                    queue: VecDeque::new(),
                    filters: Vec::new(),
                    pre_hooks: Vec::new(),
                    post_hooks: Vec::new(),
                    ledger: StatsLedger::default(),
                }),
            }),
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.shared.config
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Lock only while the bus accepts work
    fn enabled_state(&self) -> Option<MutexGuard<'_, BusState>> {
        let state = self.state();
        if state.enabled {
            Some(state)
        } else {
            None
        }
    }

    /// Dispatch an event
    ///
    /// With `immediate` the listener chain runs on the calling thread and
    /// its result is returned. Otherwise the event is queued for
    /// `process_queued_events` and `Continue` is returned.
    pub fn dispatch(&self, event: &Arc<Event>, immediate: bool) -> EventResult {
        match self.route(event, immediate) {
            Outcome::Invalid(_) => EventResult::Error,
            Outcome::Processed(delivery) => delivery.result,
            Outcome::Disabled | Outcome::Filtered | Outcome::Queued => EventResult::Continue,
        }
    }

    /// Queue an event for later processing
    pub fn dispatch_async(&self, event: &Arc<Event>) -> EventResult {
        self.dispatch(event, false)
    }

    /// Dispatch immediately, reporting failures as errors
    pub fn dispatch_checked(&self, event: &Arc<Event>) -> Result<EventResult, BusError> {
        match self.route(event, true) {
            Outcome::Invalid(errors) => Err(BusError::Validation {
                event_type: event.event_type().to_string(),
                errors,
            }),
            Outcome::Processed(delivery) if delivery.result == EventResult::Error => {
                let cause = event
                    .error()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "listener chain reported an error".to_string());
                Err(BusError::Dispatch {
                    event_type: event.event_type().to_string(),
                    listeners_notified: delivery.notified,
                    cause,
                })
            }
            Outcome::Processed(delivery) => Ok(delivery.result),
            Outcome::Disabled | Outcome::Filtered | Outcome::Queued => Ok(EventResult::Continue),
        }
    }

    fn route(&self, event: &Arc<Event>, immediate: bool) -> Outcome {
        let filters = match self.enabled_state() {
            Some(state) => state.filters.clone(),
            None => return Outcome::Disabled,
        };

        let errors = event.validate();
        if !errors.is_empty() {
            tracing::warn!(
                event_type = %event.event_type(),
                trace_id = %event.trace_id(),
                ?errors,
                "event failed validation"
            );
            event.set_error(BusError::Validation {
                event_type: event.event_type().to_string(),
                errors: errors.clone(),
            });
            self.count(StatsLedger::record_invalid);
            return Outcome::Invalid(errors);
        }

        if !passes_filters(&filters, event) {
            tracing::debug!(event_type = %event.event_type(), "event filtered");
            self.count(StatsLedger::record_filtered);
            return Outcome::Filtered;
        }

        if immediate {
            return Outcome::Processed(self.process(event));
        }

        let Some(mut state) = self.enabled_state() else {
            return Outcome::Disabled;
        };
        let mut dropped = false;
        if state.queue.len() >= self.shared.config.max_queue_size {
            if let Some(evicted) = state.queue.pop_front() {
                tracing::warn!(
                    event_type = %evicted.event_type(),
                    trace_id = %evicted.trace_id(),
                    "bus queue full, dropping oldest event"
                );
                dropped = true;
            }
        }
        state.queue.push_back(Arc::clone(event));
        if self.shared.config.enable_stats {
            state.ledger.record_queued(dropped);
        }
        Outcome::Queued
    }

    fn process(&self, event: &Arc<Event>) -> Delivery {
        let started = Instant::now();
        let (pre_hooks, post_hooks, listeners) = {
            let state = self.state();
            (
                state.pre_hooks.clone(),
                state.post_hooks.clone(),
                state.registry.listeners_for(event.event_type()),
            )
        };

        for hook in &pre_hooks {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| hook(event))) {
                tracing::warn!(
                    event_type = %event.event_type(),
                    message = %panic_message(payload.as_ref()),
                    "pre-dispatch hook panicked"
                );
            }
        }

        let delivery = deliver(event, &listeners);

        for hook in &post_hooks {
            if let Err(payload) =
                panic::catch_unwind(AssertUnwindSafe(|| hook(event, delivery.result)))
            {
                tracing::warn!(
                    event_type = %event.event_type(),
                    message = %panic_message(payload.as_ref()),
                    "post-dispatch hook panicked"
                );
            }
        }

        let elapsed = started.elapsed();
        tracing::debug!(
            event_type = %event.event_type(),
            trace_id = %event.trace_id(),
            result = %delivery.result,
            listeners = delivery.notified,
            ?elapsed,
            "event processed"
        );
        self.count(|ledger| {
            ledger.record_processed(
                event.event_type(),
                delivery.result,
                delivery.notified,
                event.has_error(),
                elapsed,
            )
        });
        delivery
    }

    fn count(&self, f: impl FnOnce(&mut StatsLedger)) {
        if self.shared.config.enable_stats {
            f(&mut self.state().ledger);
        }
    }

    /// Drain queued events oldest-first until the queue is empty or the
    /// time budget is spent. Returns how many events were processed.
    pub fn process_queued_events(&self, max_time: Option<Duration>) -> usize {
        let budget = max_time.unwrap_or(self.shared.config.max_processing_time);
        let started = Instant::now();
        let mut processed = 0;

        while started.elapsed() < budget {
            let next = match self.enabled_state() {
                Some(mut state) => state.queue.pop_front(),
                None => break,
            };
            let Some(event) = next else { break };
            self.process(&event);
            processed += 1;
        }
        processed
    }

    /// Register a listener. Returns `Ok(false)` when the bus is disabled.
    pub fn register_listener(&self, listener: Arc<dyn EventListener>) -> Result<bool, BusError> {
        let Some(mut state) = self.enabled_state() else {
            return Ok(false);
        };
        let listener_id = listener.listener_id().to_string();
        state.registry.register(listener)?;
        tracing::debug!(%listener_id, "listener registered");
        Ok(true)
    }

    pub fn unregister_listener(&self, listener_id: &str) -> bool {
        let Some(mut state) = self.enabled_state() else {
            return false;
        };
        let removed = state.registry.unregister(listener_id);
        if removed {
            tracing::debug!(%listener_id, "listener unregistered");
        }
        removed
    }

    pub fn get_listener(&self, listener_id: &str) -> Option<Arc<dyn EventListener>> {
        self.state().registry.get(listener_id)
    }

    pub fn listener_count(&self) -> usize {
        self.state().registry.len()
    }

    pub fn add_filter(&self, filter: EventFilter) -> bool {
        self.enabled_state()
            .is_some_and(|mut state| add_unique(&mut state.filters, filter))
    }

    pub fn remove_filter(&self, filter: &EventFilter) -> bool {
        self.enabled_state()
            .is_some_and(|mut state| remove_by_identity(&mut state.filters, filter))
    }

    pub fn add_pre_dispatch_hook(&self, hook: PreDispatchHook) -> bool {
        self.enabled_state()
            .is_some_and(|mut state| add_unique(&mut state.pre_hooks, hook))
    }

    pub fn remove_pre_dispatch_hook(&self, hook: &PreDispatchHook) -> bool {
        self.enabled_state()
            .is_some_and(|mut state| remove_by_identity(&mut state.pre_hooks, hook))
    }

    pub fn add_post_dispatch_hook(&self, hook: PostDispatchHook) -> bool {
        self.enabled_state()
            .is_some_and(|mut state| add_unique(&mut state.post_hooks, hook))
    }

    pub fn remove_post_dispatch_hook(&self, hook: &PostDispatchHook) -> bool {
        self.enabled_state()
            .is_some_and(|mut state| remove_by_identity(&mut state.post_hooks, hook))
    }

    pub fn queue_len(&self) -> usize {
        self.state().queue.len()
    }

    /// Drop every queued event, returning how many were discarded
    pub fn clear_queue(&self) -> usize {
        let mut state = self.state();
        let cleared = state.queue.len();
        state.queue.clear();
        cleared
    }

    pub fn is_enabled(&self) -> bool {
        self.state().enabled
    }

    /// Enable or disable the bus. A bus that has been shut down stays
    /// disabled; returns the resulting state.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        let mut state = self.state();
        if state.shut_down {
            if enabled {
                tracing::warn!("refusing to re-enable a bus after shutdown");
            }
            return false;
        }
        state.enabled = enabled;
        enabled
    }

    pub fn stats(&self) -> BusStats {
        let state = self.state();
        state
            .ledger
            .snapshot(state.queue.len(), state.registry.len())
    }

    pub fn reset_stats(&self) {
        self.state().ledger = StatsLedger::default();
    }

    /// Disable the bus for good and release everything it holds
    pub fn shutdown(&self) {
        let mut state = self.state();
        state.enabled = false;
        state.shut_down = true;
        let dropped = state.queue.len();
        state.queue.clear();
        state.registry.clear();
        state.filters.clear();
        state.pre_hooks.clear();
        state.post_hooks.clear();
        tracing::debug!(dropped, "event bus shut down");
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_config(BusConfig::default())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("EventBus")
            .field("enabled", &state.enabled)
            .field("listeners", &state.registry.len())
            .field("queued", &state.queue.len())
            .field("filters", &state.filters.len())
            .finish()
    }
}

/// Filters run in order; the first `false` blocks. A panicking filter
/// is logged and treated as passing.
fn passes_filters(filters: &[EventFilter], event: &Event) -> bool {
    for filter in filters {
        match panic::catch_unwind(AssertUnwindSafe(|| filter(event))) {
            Ok(true) => {}
            Ok(false) => return false,
            Err(payload) => {
                tracing::warn!(
                    event_type = %event.event_type(),
                    message = %panic_message(payload.as_ref()),
                    "event filter panicked, letting event through"
                );
            }
        }
    }
    true
}

fn add_unique<T: ?Sized>(list: &mut Vec<Arc<T>>, item: Arc<T>) -> bool {
    if list.iter().any(|existing| Arc::ptr_eq(existing, &item)) {
        return false;
    }
    list.push(item);
    true
}

fn remove_by_identity<T: ?Sized>(list: &mut Vec<Arc<T>>, item: &Arc<T>) -> bool {
    let before = list.len();
    list.retain(|existing| !Arc::ptr_eq(existing, item));
    list.len() != before
}
