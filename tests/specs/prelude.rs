//! Shared helpers for behavioral specs

#![allow(dead_code)]

pub use serde_json::json;
pub use std::sync::{Arc, Mutex};
pub use std::time::Duration;
pub use tidings_core::{
    BusConfig, BusError, Event, EventBus, EventListener, EventPattern, EventResult, FakeClock,
    Listener, PatternState, Priority, Timers,
};

/// Ordered record of which listener saw which event
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Listener that journals its id for `event_type` and returns `result`
    pub fn listener(
        &self,
        id: &str,
        priority: Priority,
        event_type: &str,
        result: EventResult,
    ) -> Arc<dyn EventListener> {
        let journal = self.clone();
        let name = id.to_string();
        Arc::new(
            Listener::builder(id)
                .priority(priority)
                .on(event_type, move |_| {
                    journal.push(name.clone());
                    Ok(result)
                })
                .build(),
        )
    }
}

pub fn event(event_type: &str) -> Arc<Event> {
    Arc::new(Event::simple(event_type, json!({})))
}

/// Fake-clock timers plus a helper to advance and fire
pub struct ManualTime {
    pub clock: FakeClock,
    pub timers: Timers,
}

impl ManualTime {
    pub fn new() -> Self {
        let clock = FakeClock::new();
        let timers = Timers::new(Arc::new(clock.clone()));
        Self { clock, timers }
    }

    pub fn advance(&self, by: Duration) -> usize {
        self.clock.advance(by);
        self.timers.fire_due()
    }
}
