// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Async dispatcher bounded by a counting semaphore

use super::{deliver_recorded, DispatcherStats, StatsRecorder};
use crate::event::{Event, EventResult};
use crate::listener::EventListener;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Dispatches on the tokio blocking pool with at most `max_concurrent`
/// events in flight
///
/// Each event's listener chain still runs serially; only different events
/// overlap. Cheap to clone; clones share the semaphore and stats.
#[derive(Clone, Debug)]
pub struct AsyncEventDispatcher {
    max_concurrent: usize,
    permits: Arc<Semaphore>,
    stats: Arc<StatsRecorder>,
}

impl AsyncEventDispatcher {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            stats: Arc::new(StatsRecorder::default()),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Events currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.max_concurrent
            .saturating_sub(self.permits.available_permits())
    }

    /// Deliver one event once a permit is free
    pub async fn dispatch(
        &self,
        event: Arc<Event>,
        listeners: Vec<Arc<dyn EventListener>>,
    ) -> EventResult {
        let permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!(event_type = %event.event_type(), "dispatcher semaphore closed");
                return EventResult::Continue;
            }
        };

        let stats = Arc::clone(&self.stats);
        let event_type = event.event_type().to_string();
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            deliver_recorded(&stats, &event, &listeners)
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(%event_type, error = %e, "dispatch task failed");
                EventResult::Error
            }
        }
    }

    /// Dispatch many events concurrently; results come back in input order
    pub async fn dispatch_batch(
        &self,
        batch: Vec<(Arc<Event>, Vec<Arc<dyn EventListener>>)>,
    ) -> Vec<EventResult> {
        let tasks: Vec<_> = batch
            .into_iter()
            .map(|(event, listeners)| {
                let dispatcher = self.clone();
                tokio::spawn(async move { dispatcher.dispatch(event, listeners).await })
            })
            .collect();

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            results.push(task.await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "batch dispatch task failed");
                EventResult::Error
            }));
        }
        results
    }

    pub fn stats(&self) -> DispatcherStats {
        self.stats.snapshot()
    }
}

impl Default for AsyncEventDispatcher {
    fn default() -> Self {
        Self::new(10)
    }
}
