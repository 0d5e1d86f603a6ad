// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus and dispatcher configuration
//!
//! Both configs deserialize from TOML with every field optional:
//!
//! ```toml
//! max_queue_size = 5000
//! enable_stats = true
//! max_processing_time = "16ms"
//! ```

use crate::dispatch::{
    AsyncEventDispatcher, EventDispatcher, PriorityDispatcher, QueuedDispatcher,
    SynchronousDispatcher, ThreadedDispatcher,
};
use crate::error::BusError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// `EventBus` configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Queue capacity for deferred dispatch; the oldest event is dropped when full
    pub max_queue_size: usize,
    pub enable_stats: bool,
    /// Default time budget for one `process_queued_events` call
    #[serde(with = "humantime_serde")]
    pub max_processing_time: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 10_000,
            enable_stats: true,
            max_processing_time: Duration::from_secs(1),
        }
    }
}

impl BusConfig {
    pub fn new(max_queue_size: usize) -> Self {
        Self {
            max_queue_size,
            ..Self::default()
        }
    }

    pub fn with_stats(mut self, enable_stats: bool) -> Self {
        self.enable_stats = enable_stats;
        self
    }

    pub fn with_max_processing_time(mut self, budget: Duration) -> Self {
        self.max_processing_time = budget;
        self
    }

    pub fn validate(&self) -> Result<(), BusError> {
        if self.max_queue_size == 0 {
            return Err(BusError::Config(
                "max_queue_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_toml_str(source: &str) -> Result<Self, BusError> {
        let config: Self = toml::from_str(source).map_err(|e| BusError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, BusError> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| BusError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }
}

/// Which dispatch strategy a `DispatcherConfig` builds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatcherKind {
    #[default]
    Synchronous,
    Threaded,
    Queued,
    Priority,
    Async,
}

/// Dispatcher configuration; only the fields of the selected kind are used
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub kind: DispatcherKind,
    pub max_threads: usize,
    pub max_queue_size: usize,
    pub batch_size: usize,
    pub max_concurrent: usize,
    pub respect_listener_priority: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            kind: DispatcherKind::Synchronous,
            max_threads: 4,
            max_queue_size: 1000,
            batch_size: 100,
            max_concurrent: 10,
            respect_listener_priority: true,
        }
    }
}

impl DispatcherConfig {
    pub fn new(kind: DispatcherKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), BusError> {
        let zero = match self.kind {
            DispatcherKind::Threaded if self.max_threads == 0 => Some("max_threads"),
            DispatcherKind::Queued if self.max_queue_size == 0 => Some("max_queue_size"),
            DispatcherKind::Queued if self.batch_size == 0 => Some("batch_size"),
            DispatcherKind::Async if self.max_concurrent == 0 => Some("max_concurrent"),
            _ => None,
        };
        match zero {
            Some(field) => Err(BusError::Config(format!("{} must be at least 1", field))),
            None => Ok(()),
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, BusError> {
        let config: Self = toml::from_str(source).map_err(|e| BusError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Build a caller-driven dispatcher
    ///
    /// `DispatcherKind::Async` is rejected here; use `build_async`.
    pub fn build(&self) -> Result<Box<dyn EventDispatcher>, BusError> {
        self.validate()?;
        let dispatcher: Box<dyn EventDispatcher> = match self.kind {
            DispatcherKind::Synchronous => Box::new(SynchronousDispatcher::new()),
            DispatcherKind::Threaded => Box::new(ThreadedDispatcher::new(self.max_threads)),
            DispatcherKind::Queued => {
                Box::new(QueuedDispatcher::new(self.max_queue_size, self.batch_size))
            }
            DispatcherKind::Priority => {
                Box::new(PriorityDispatcher::new(self.respect_listener_priority))
            }
            DispatcherKind::Async => {
                return Err(BusError::Config(
                    "the async dispatcher is built with build_async".to_string(),
                ))
            }
        };
        Ok(dispatcher)
    }

    pub fn build_async(&self) -> Result<AsyncEventDispatcher, BusError> {
        if self.kind != DispatcherKind::Async {
            return Err(BusError::Config(format!(
                "{:?} is not an async dispatcher",
                self.kind
            )));
        }
        self.validate()?;
        Ok(AsyncEventDispatcher::new(self.max_concurrent))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
