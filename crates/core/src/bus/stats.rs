// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cumulative bus statistics

use crate::event::EventResult;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Immutable snapshot of bus counters, taken by `EventBus::stats`
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BusStats {
    /// Events that reached the listener chain
    pub events_dispatched: u64,
    pub events_queued: u64,
    /// Queued events evicted because the queue was full
    pub events_dropped: u64,
    pub events_filtered: u64,
    pub validation_failures: u64,
    pub listeners_notified: u64,
    /// Processed events that carried an error afterwards
    pub errors: u64,
    pub events_by_type: BTreeMap<String, u64>,
    pub results: BTreeMap<EventResult, u64>,
    #[serde(with = "humantime_serde")]
    pub total_processing_time: Duration,
    #[serde(with = "humantime_serde")]
    pub average_processing_time: Duration,
    pub average_listeners_per_event: f64,
    pub queue_size: usize,
    pub registered_listeners: usize,
}

/// Mutable counters behind the bus lock
#[derive(Debug, Default)]
pub(super) struct StatsLedger {
    events_dispatched: u64,
    events_queued: u64,
    events_dropped: u64,
    events_filtered: u64,
    validation_failures: u64,
    listeners_notified: u64,
    errors: u64,
    events_by_type: BTreeMap<String, u64>,
    results: BTreeMap<EventResult, u64>,
    total_processing_time: Duration,
}

impl StatsLedger {
    pub(super) fn record_processed(
        &mut self,
        event_type: &str,
        result: EventResult,
        notified: usize,
        errored: bool,
        elapsed: Duration,
    ) {
        self.events_dispatched += 1;
        self.listeners_notified += notified as u64;
        *self.events_by_type.entry(event_type.to_string()).or_default() += 1;
        *self.results.entry(result).or_default() += 1;
        if errored {
            self.errors += 1;
        }
        self.total_processing_time += elapsed;
    }

    pub(super) fn record_queued(&mut self, dropped: bool) {
        self.events_queued += 1;
        if dropped {
            self.events_dropped += 1;
        }
    }

    pub(super) fn record_filtered(&mut self) {
        self.events_filtered += 1;
    }

    pub(super) fn record_invalid(&mut self) {
        self.validation_failures += 1;
    }

    pub(super) fn snapshot(&self, queue_size: usize, registered_listeners: usize) -> BusStats {
        let (average_processing_time, average_listeners_per_event) = match self.events_dispatched
        {
            0 => (Duration::ZERO, 0.0),
            n => (
                self.total_processing_time
                    .checked_div(u32::try_from(n).unwrap_or(u32::MAX))
                    .unwrap_or_default(),
                self.listeners_notified as f64 / n as f64,
            ),
        };

        BusStats {
            events_dispatched: self.events_dispatched,
            events_queued: self.events_queued,
            events_dropped: self.events_dropped,
            events_filtered: self.events_filtered,
            validation_failures: self.validation_failures,
            listeners_notified: self.listeners_notified,
            errors: self.errors,
            events_by_type: self.events_by_type.clone(),
            results: self.results.clone(),
            total_processing_time: self.total_processing_time,
            average_processing_time,
            average_listeners_per_event,
            queue_size,
            registered_listeners,
        }
    }
}
