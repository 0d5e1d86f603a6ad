// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer-driven patterns: conditional, delayed and recurring dispatch

use super::{EventPattern, Plan};
use crate::bus::EventBus;
use crate::error::{panic_message, BusError};
use crate::event::Event;
use crate::timer::Timers;
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

impl EventPattern {
    /// Dispatch `event` once `condition` holds
    ///
    /// The condition is polled on start and then every `check_interval`.
    /// If `timeout` passes first the pattern is cancelled with a `timeout`
    /// metadata flag. Each poll settles at most one way.
    pub fn conditional(
        bus: &EventBus,
        timers: &Timers,
        event: Arc<Event>,
        condition: impl Fn() -> bool + Send + Sync + 'static,
        check_interval: Duration,
        timeout: Option<Duration>,
    ) -> Self {
        Self::from_plan(Plan::Conditional {
            bus: bus.clone(),
            timers: timers.clone(),
            event,
            condition: Arc::new(condition),
            check_interval,
            timeout,
        })
    }

    /// Dispatch `event` once after `delay`
    pub fn delayed(bus: &EventBus, timers: &Timers, event: Arc<Event>, delay: Duration) -> Self {
        Self::from_plan(Plan::Delayed {
            bus: bus.clone(),
            timers: timers.clone(),
            event,
            delay,
        })
    }

    /// Dispatch a fresh copy of `event` every `interval`
    ///
    /// Each fire gets its own trace id. Without `max_occurrences` the
    /// pattern runs until cancelled.
    pub fn recurring(
        bus: &EventBus,
        timers: &Timers,
        event: Arc<Event>,
        interval: Duration,
        max_occurrences: Option<u32>,
    ) -> Self {
        Self::from_plan(Plan::Recurring {
            bus: bus.clone(),
            timers: timers.clone(),
            event,
            interval,
            max_occurrences,
        })
    }

    pub(super) fn poll_condition(&self) {
        self.step(|| {
            let Plan::Conditional {
                bus,
                timers,
                event,
                condition,
                check_interval,
                timeout,
            } = &self.inner.plan
            else {
                return;
            };
            if !self.is_active() {
                return;
            }
            self.core().timer = None;

            match panic::catch_unwind(AssertUnwindSafe(|| condition())) {
                Ok(true) => {
                    bus.dispatch(event, true);
                    self.complete();
                }
                Ok(false) => {
                    let started = self.core().clock_start.unwrap_or_else(|| timers.now());
                    let elapsed = timers.now().saturating_duration_since(started);
                    match timeout {
                        Some(limit) if elapsed >= *limit => {
                            tracing::debug!(pattern_id = %self.id(), ?elapsed, "condition timed out");
                            self.cancel_with(Some("timeout"));
                        }
                        Some(limit) => {
                            let next = (*check_interval).min(*limit - elapsed);
                            self.arm(timers, next, Self::poll_condition);
                        }
                        None => self.arm(timers, *check_interval, Self::poll_condition),
                    }
                }
                Err(payload) => {
                    self.fail(BusError::Pattern {
                        pattern_id: self.id().to_string(),
                        message: format!("condition panicked: {}", panic_message(payload.as_ref())),
                    });
                }
            }
        });
    }

    pub(super) fn fire_delayed(&self) {
        self.step(|| {
            let Plan::Delayed { bus, event, .. } = &self.inner.plan else {
                return;
            };
            if !self.is_active() {
                return;
            }
            self.core().timer = None;
            bus.dispatch(event, true);
            self.complete();
        });
    }

    pub(super) fn fire_recurring(&self) {
        self.step(|| {
            let Plan::Recurring {
                bus,
                timers,
                event,
                interval,
                max_occurrences,
            } = &self.inner.plan
            else {
                return;
            };
            if !self.is_active() {
                return;
            }
            self.core().timer = None;

            bus.dispatch(&Arc::new(event.clone_fresh()), true);
            let count = {
                let mut core = self.core();
                core.occurrence_count += 1;
                core.occurrence_count
            };

            if max_occurrences.is_some_and(|max| count >= max) {
                self.finish_recurring();
            } else if self.is_active() {
                self.arm(timers, *interval, Self::fire_recurring);
            }
        });
    }

    pub(super) fn finish_recurring(&self) {
        {
            let mut core = self.core();
            let total = core.occurrence_count;
            core.metadata
                .insert("total_occurrences".to_string(), Value::from(total));
        }
        self.complete();
    }
}
