// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Closure-backed listener with an explicitly built handler table

use super::EventListener;
use crate::error::{panic_message, BusError};
use crate::event::{Event, EventPayload, EventResult, Priority};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What a handler returns; `Err` is contained by the listener
pub type HandlerResult = Result<EventResult, Box<dyn std::error::Error + Send + Sync>>;

type Handler = Arc<dyn Fn(&Event) -> HandlerResult + Send + Sync>;

/// Builds a `Listener`'s event_type → handlers table
pub struct ListenerBuilder {
    id: String,
    priority: Priority,
    enabled: bool,
    types: Vec<String>,
    handlers: HashMap<String, Vec<Handler>>,
}

impl ListenerBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            priority: Priority::NORMAL,
            enabled: true,
            types: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Start disabled; enable later through the registry
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Add a handler for an event type; handlers run in the order added
    pub fn on<F>(mut self, event_type: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Event) -> HandlerResult + Send + Sync + 'static,
    {
        let event_type = event_type.into();
        if !self.handlers.contains_key(&event_type) {
            self.types.push(event_type.clone());
        }
        self.handlers
            .entry(event_type)
            .or_default()
            .push(Arc::new(handler));
        self
    }

    /// Add a handler that receives the typed payload of `T::EVENT_TYPE`
    ///
    /// An event of that type carrying some other payload is reported as a
    /// handler error.
    pub fn on_payload<T, F>(self, handler: F) -> Self
    where
        T: EventPayload,
        F: Fn(&Event, &T) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(T::EVENT_TYPE, move |event: &Event| match event.payload::<T>() {
            Some(payload) => handler(event, payload),
            None => Err(format!(
                "payload of {} is not {}",
                event.event_type(),
                std::any::type_name::<T>()
            )
            .into()),
        })
    }

    pub fn build(self) -> Listener {
        Listener {
            id: self.id,
            priority: self.priority,
            enabled: AtomicBool::new(self.enabled),
            types: self.types,
            handlers: self.handlers,
        }
    }
}

/// A listener whose handlers were registered through `ListenerBuilder`
pub struct Listener {
    id: String,
    priority: Priority,
    enabled: AtomicBool,
    types: Vec<String>,
    handlers: HashMap<String, Vec<Handler>>,
}

impl Listener {
    pub fn builder(id: impl Into<String>) -> ListenerBuilder {
        ListenerBuilder::new(id)
    }

    fn fail(&self, event: &Event, message: String) -> EventResult {
        tracing::warn!(
            listener_id = %self.id,
            event_type = %event.event_type(),
            trace_id = %event.trace_id(),
            %message,
            "handler failed"
        );
        event.set_error(BusError::Listener {
            listener_id: self.id.clone(),
            message,
        });
        EventResult::Error
    }
}

impl EventListener for Listener {
    fn listener_id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn handled_events(&self) -> Vec<String> {
        self.types.clone()
    }

    fn handle_event(&self, event: &Event) -> EventResult {
        let Some(handlers) = self.handlers.get(event.event_type()) else {
            return EventResult::Continue;
        };

        let mut outcome = EventResult::Continue;
        for handler in handlers {
            let result = match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => return self.fail(event, e.to_string()),
                Err(payload) => return self.fail(event, panic_message(payload.as_ref())),
            };
            match result {
                EventResult::Continue => {}
                EventResult::Handled => outcome = EventResult::Handled,
                terminal => return terminal,
            }
        }
        outcome
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("enabled", &self.is_enabled())
            .field("types", &self.types)
            .finish()
    }
}
