// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listeners and the listener registry
//!
//! This module provides:
//! - `EventListener` - the capability consumers implement
//! - `Listener` / `ListenerBuilder` - handler tables built by explicit registration
//! - `ListenerRegistry` - id index plus the priority-ordered per-type index

mod handler;
mod registry;

pub use handler::{HandlerResult, Listener, ListenerBuilder};
pub use registry::ListenerRegistry;

use crate::event::{Event, EventResult, Priority};

/// A consumer of events of declared types
pub trait EventListener: Send + Sync {
    /// Unique id within a registry
    fn listener_id(&self) -> &str;

    fn priority(&self) -> Priority {
        Priority::NORMAL
    }

    /// Disabled listeners stay registered but are skipped by dispatch
    fn is_enabled(&self) -> bool {
        true
    }

    fn set_enabled(&self, _enabled: bool) {}

    /// Event types this listener wants to receive
    fn handled_events(&self) -> Vec<String>;

    /// Process one event. Faults must be reported as `EventResult::Error`.
    fn handle_event(&self, event: &Event) -> EventResult;
}
