// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the event bus

use std::any::Any;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the bus, its dispatchers and patterns
///
/// Routine failures (validation, listener faults) travel as values: they are
/// recorded on the event and reported through `EventResult::Error`. Only
/// programmer errors (duplicate registration, malformed configuration) are
/// returned as `Err` from the hot API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("dispatch of {event_type} failed after notifying {listeners_notified} listener(s): {cause}")]
    Dispatch {
        event_type: String,
        listeners_notified: usize,
        cause: String,
    },
    #[error("listener {listener_id} failed: {message}")]
    Listener {
        listener_id: String,
        message: String,
    },
    #[error("registration rejected: {0}")]
    Registration(String),
    #[error("event {event_type} failed validation: {}", errors.join("; "))]
    Validation {
        event_type: String,
        errors: Vec<String>,
    },
    #[error("{what} timed out after {after:?}")]
    Timeout { what: String, after: Duration },
    #[error("pattern {pattern_id} failed: {message}")]
    Pattern { pattern_id: String, message: String },
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Render a caught panic payload as a message
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
