// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatched event and its per-pass runtime state

use super::payload::{ErasedPayload, GenericPayload, TypedPayload};
use super::{EventContext, EventPayload, EventResult, Priority};
use crate::error::BusError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// One dispatched unit: a typed payload, its context and runtime state
///
/// Events are shared as `Arc<Event>` so listeners on any thread can mark
/// them. Runtime transitions only ever raise the result in `EventResult`
/// precedence order; a terminal result is never reverted.
pub struct Event {
    event_type: String,
    context: EventContext,
    payload: Box<dyn ErasedPayload>,
    runtime: Mutex<RuntimeState>,
}

#[derive(Clone, Debug, Default)]
struct RuntimeState {
    cancelled: bool,
    cancel_reason: Option<String>,
    result: EventResult,
    processed_by: Vec<String>,
    error: Option<BusError>,
}

/// Serialized shape of an event
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct EventEnvelope {
    pub event_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub context: Option<EventContext>,
}

impl Event {
    /// Create an event from a typed payload with a fresh context
    pub fn new<T: EventPayload>(payload: T) -> Self {
        Self::from_parts(Box::new(TypedPayload(payload)), EventContext::new())
    }

    /// Create an ad-hoc event carrying free-form JSON data
    pub fn simple(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self::from_parts(
            Box::new(GenericPayload::new(event_type, data)),
            EventContext::new(),
        )
    }

    pub(crate) fn from_parts(payload: Box<dyn ErasedPayload>, context: EventContext) -> Self {
        Self {
            event_type: payload.event_type().to_string(),
            context,
            payload,
            runtime: Mutex::new(RuntimeState::default()),
        }
    }

    /// Replace the context (only while the event is still being built)
    pub fn with_context(mut self, context: EventContext) -> Self {
        self.context = context;
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn context(&self) -> &EventContext {
        &self.context
    }

    pub fn trace_id(&self) -> &str {
        self.context.trace_id()
    }

    pub fn priority(&self) -> Priority {
        self.context.priority()
    }

    /// Borrow the payload as a concrete type
    ///
    /// Works for `EventPayload` types and for `GenericPayload`.
    pub fn payload<T: 'static>(&self) -> Option<&T> {
        self.payload.as_any().downcast_ref::<T>()
    }

    /// The payload rendered as JSON (`Null` if it cannot be serialized)
    pub fn payload_value(&self) -> serde_json::Value {
        self.payload.to_value().unwrap_or_else(|e| {
            tracing::warn!(event_type = %self.event_type, error = %e, "payload failed to serialize");
            serde_json::Value::Null
        })
    }

    /// Check the event is dispatchable; empty means valid
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.event_type.trim().is_empty() {
            errors.push("event type must not be empty".to_string());
        }
        errors.extend(self.payload.validate());
        errors
    }

    /// Serialize type, payload and context to JSON
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "event_type": self.event_type,
            "payload": self.payload_value(),
            "context": self.context,
        })
    }

    /// Decode an event serialized by `to_value`
    ///
    /// The payload comes back as a `GenericPayload`; use an `EventCodec`
    /// to recover registered payload types.
    pub fn from_value(value: serde_json::Value) -> Result<Self, BusError> {
        super::EventCodec::new().decode(value)
    }

    /// Same payload and context, fresh trace id, clean runtime state
    pub fn clone_fresh(&self) -> Self {
        Self {
            event_type: self.event_type.clone(),
            context: self.context.clone_fresh(),
            payload: self.payload.clone_box(),
            runtime: Mutex::new(RuntimeState::default()),
        }
    }

    fn runtime(&self) -> MutexGuard<'_, RuntimeState> {
        self.runtime.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn result(&self) -> EventResult {
        self.runtime().result
    }

    pub fn is_cancelled(&self) -> bool {
        self.runtime().cancelled
    }

    pub fn is_consumed(&self) -> bool {
        self.runtime().result == EventResult::Consumed
    }

    /// True once someone handled or consumed the event
    pub fn is_handled(&self) -> bool {
        matches!(
            self.runtime().result,
            EventResult::Handled | EventResult::Consumed
        )
    }

    pub fn has_error(&self) -> bool {
        self.runtime().error.is_some()
    }

    pub fn error(&self) -> Option<BusError> {
        self.runtime().error.clone()
    }

    pub fn cancel_reason(&self) -> Option<String> {
        self.runtime().cancel_reason.clone()
    }

    /// Ids of listeners that saw this event, in notification order
    pub fn processed_by(&self) -> Vec<String> {
        self.runtime().processed_by.clone()
    }

    /// Cancel the event; later listeners in the pass are skipped
    pub fn cancel(&self, reason: Option<&str>) {
        let mut runtime = self.runtime();
        runtime.cancelled = true;
        if runtime.cancel_reason.is_none() {
            runtime.cancel_reason = reason.map(str::to_string);
        }
        runtime.result = runtime.result.max(EventResult::Cancelled);
    }

    /// Take ownership of the event; later listeners in the pass are skipped
    pub fn consume(&self) {
        let mut runtime = self.runtime();
        runtime.result = runtime.result.max(EventResult::Consumed);
    }

    pub fn mark_handled(&self) {
        let mut runtime = self.runtime();
        runtime.result = runtime.result.max(EventResult::Handled);
    }

    /// Record a failure; the event ends the pass as `Error`
    pub fn set_error(&self, error: BusError) {
        let mut runtime = self.runtime();
        runtime.error = Some(error);
        runtime.result = EventResult::Error;
    }

    /// Append a listener id to `processed_by` unless already present
    pub fn mark_processed_by(&self, listener_id: &str) {
        let mut runtime = self.runtime();
        if !runtime.processed_by.iter().any(|id| id == listener_id) {
            runtime.processed_by.push(listener_id.to_string());
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let runtime = self.runtime();
        f.debug_struct("Event")
            .field("event_type", &self.event_type)
            .field("trace_id", &self.context.trace_id())
            .field("payload", &self.payload)
            .field("result", &runtime.result)
            .field("cancelled", &runtime.cancelled)
            .field("processed_by", &runtime.processed_by)
            .finish()
    }
}
