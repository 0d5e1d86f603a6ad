// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event chains

use super::{EventPattern, Plan};
use crate::bus::EventBus;
use crate::error::BusError;
use crate::event::{Event, EventResult};
use std::sync::Arc;

impl EventPattern {
    /// Dispatch `events` in order, one immediate dispatch each
    ///
    /// With `stop_on_error`, the first `EventResult::Error` fails the chain
    /// and later events are never dispatched.
    pub fn chain(bus: &EventBus, events: Vec<Arc<Event>>, stop_on_error: bool) -> Self {
        Self::from_plan(Plan::Chain {
            bus: bus.clone(),
            events,
            stop_on_error,
        })
    }

    pub(super) fn run_chain(
        &self,
        bus: &EventBus,
        events: &[Arc<Event>],
        stop_on_error: bool,
    ) -> Result<(), BusError> {
        for (index, event) in events.iter().enumerate() {
            if !self.is_active() {
                return Ok(());
            }
            self.core().current_index = index;

            let result = bus.dispatch(event, true);
            if result == EventResult::Error && stop_on_error {
                let cause = event
                    .error()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "dispatch returned an error".to_string());
                return Err(BusError::Dispatch {
                    event_type: event.event_type().to_string(),
                    listeners_notified: event.processed_by().len(),
                    cause,
                });
            }
        }

        if self.is_active() {
            self.core().current_index = events.len();
            self.complete();
        }
        Ok(())
    }
}
