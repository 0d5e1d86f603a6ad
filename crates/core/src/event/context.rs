// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event metadata envelope

use super::Priority;
use crate::id::{mint_trace_id, IdGen};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata carried alongside every event
///
/// Fixed once the event is built; `clone_fresh` is the only way to derive a
/// new context, and it always mints a new trace id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    target: Option<String>,
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default = "mint_trace_id")]
    trace_id: String,
}

impl EventContext {
    pub fn new() -> Self {
        Self::with_trace_id(mint_trace_id())
    }

    /// Build a context whose trace id comes from the given generator
    pub fn from_id_gen(id_gen: &impl IdGen) -> Self {
        Self::with_trace_id(id_gen.next())
    }

    fn with_trace_id(trace_id: String) -> Self {
        Self {
            source: None,
            target: None,
            timestamp: Utc::now(),
            priority: Priority::NORMAL,
            metadata: BTreeMap::new(),
            trace_id,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Copy everything except the trace id, which is re-minted
    pub fn clone_fresh(&self) -> Self {
        Self {
            trace_id: mint_trace_id(),
            ..self.clone()
        }
    }
}

impl Default for EventContext {
    fn default() -> Self {
        Self::new()
    }
}
