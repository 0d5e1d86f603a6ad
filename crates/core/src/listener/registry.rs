// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener registry: id index plus a derived per-type index

use super::EventListener;
use crate::error::BusError;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

struct Registered {
    listener: Arc<dyn EventListener>,
    /// Registration order, used to break priority ties
    seq: u64,
}

/// Index of listeners by id and by handled event type
#[derive(Default)]
pub struct ListenerRegistry {
    by_id: HashMap<String, Registered>,
    /// Listener ids per event type, in registration order
    by_type: HashMap<String, Vec<String>>,
    next_seq: u64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener under its id
    pub fn register(&mut self, listener: Arc<dyn EventListener>) -> Result<(), BusError> {
        let id = listener.listener_id().to_string();
        if id.trim().is_empty() {
            return Err(BusError::Registration(
                "listener id must not be empty".to_string(),
            ));
        }
        if self.by_id.contains_key(&id) {
            return Err(BusError::Registration(format!(
                "listener {} is already registered",
                id
            )));
        }

        for event_type in listener.handled_events() {
            let ids = self.by_type.entry(event_type).or_default();
            if !ids.contains(&id) {
                ids.push(id.clone());
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_id.insert(id, Registered { listener, seq });
        Ok(())
    }

    /// Remove a listener; unknown ids are ignored
    pub fn unregister(&mut self, listener_id: &str) -> bool {
        if self.by_id.remove(listener_id).is_none() {
            return false;
        }
        self.by_type.retain(|_, ids| {
            ids.retain(|id| id != listener_id);
            !ids.is_empty()
        });
        true
    }

    /// Look up a listener by id, enabled or not
    pub fn get(&self, listener_id: &str) -> Option<Arc<dyn EventListener>> {
        self.by_id
            .get(listener_id)
            .map(|registered| Arc::clone(&registered.listener))
    }

    /// Enabled listeners for an event type in dispatch order:
    /// descending priority, ties in registration order
    pub fn listeners_for(&self, event_type: &str) -> Vec<Arc<dyn EventListener>> {
        let Some(ids) = self.by_type.get(event_type) else {
            return Vec::new();
        };

        let mut found: Vec<&Registered> = ids
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .filter(|registered| registered.listener.is_enabled())
            .collect();
        found.sort_by_key(|registered| (Reverse(registered.listener.priority()), registered.seq));
        found
            .into_iter()
            .map(|registered| Arc::clone(&registered.listener))
            .collect()
    }

    pub fn contains(&self, listener_id: &str) -> bool {
        self.by_id.contains_key(listener_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Listener ids in registration order
    pub fn listener_ids(&self) -> Vec<String> {
        let mut registered: Vec<(&String, u64)> = self
            .by_id
            .iter()
            .map(|(id, registered)| (id, registered.seq))
            .collect();
        registered.sort_by_key(|(_, seq)| *seq);
        registered.into_iter().map(|(id, _)| id.clone()).collect()
    }

    /// Event types with at least one registered listener
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.by_type.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_type.clear();
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listener_ids())
            .field("event_types", &self.event_types())
            .finish()
    }
}
