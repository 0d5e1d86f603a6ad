// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caller-thread dispatchers

use super::{deliver_recorded, DispatcherStats, EventDispatcher, StatsRecorder};
use crate::event::{Event, EventResult};
use crate::listener::EventListener;
use std::cmp::Reverse;
use std::sync::Arc;

/// Delivers serially on the calling thread
#[derive(Debug, Default)]
pub struct SynchronousDispatcher {
    stats: StatsRecorder,
}

impl SynchronousDispatcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventDispatcher for SynchronousDispatcher {
    fn name(&self) -> &'static str {
        "synchronous"
    }

    fn dispatch(&self, event: &Arc<Event>, listeners: &[Arc<dyn EventListener>]) -> EventResult {
        deliver_recorded(&self.stats, event, listeners)
    }

    fn stats(&self) -> DispatcherStats {
        self.stats.snapshot()
    }
}

/// Sorts listeners by descending priority, then delivers synchronously
///
/// The sort is stable, so equal priorities keep the caller's order.
#[derive(Debug)]
pub struct PriorityDispatcher {
    respect_listener_priority: bool,
    stats: StatsRecorder,
}

impl PriorityDispatcher {
    pub fn new(respect_listener_priority: bool) -> Self {
        Self {
            respect_listener_priority,
            stats: StatsRecorder::default(),
        }
    }
}

impl Default for PriorityDispatcher {
    fn default() -> Self {
        Self::new(true)
    }
}

impl EventDispatcher for PriorityDispatcher {
    fn name(&self) -> &'static str {
        "priority"
    }

    fn dispatch(&self, event: &Arc<Event>, listeners: &[Arc<dyn EventListener>]) -> EventResult {
        if !self.respect_listener_priority {
            return deliver_recorded(&self.stats, event, listeners);
        }
        let mut ordered = listeners.to_vec();
        ordered.sort_by_key(|listener| Reverse(listener.priority()));
        deliver_recorded(&self.stats, event, &ordered)
    }

    fn stats(&self) -> DispatcherStats {
        self.stats.snapshot()
    }
}
