// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event payloads
//!
//! Producers define payload structs implementing `EventPayload`; the bus
//! only sees them through the object-safe `ErasedPayload`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// A typed event payload
///
/// ```ignore
/// #[derive(Clone, Debug, Serialize, Deserialize)]
/// struct EntityDied { entity: u32 }
///
/// impl EventPayload for EntityDied {
///     const EVENT_TYPE: &'static str = "combat.death";
/// }
/// ```
pub trait EventPayload:
    Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
    /// Type identifier listeners subscribe to
    const EVENT_TYPE: &'static str;

    /// Payload constraints; empty means valid. Must not panic.
    fn validate(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Ad-hoc payload: an event type plus free-form JSON data
///
/// Also the fallback when decoding an event type nobody registered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenericPayload {
    pub event_type: String,
    pub data: serde_json::Value,
}

impl GenericPayload {
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
        }
    }

    /// Look up a top-level field of an object payload
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }
}

/// Object-safe view of a payload
pub(crate) trait ErasedPayload: fmt::Debug + Send + Sync {
    fn event_type(&self) -> &str;
    fn validate(&self) -> Vec<String>;
    fn to_value(&self) -> Result<serde_json::Value, serde_json::Error>;
    fn clone_box(&self) -> Box<dyn ErasedPayload>;
    fn as_any(&self) -> &dyn Any;
}

/// Adapter giving any `EventPayload` an `ErasedPayload` view
#[derive(Clone, Debug)]
pub(crate) struct TypedPayload<T>(pub T);

impl<T: EventPayload> ErasedPayload for TypedPayload<T> {
    fn event_type(&self) -> &str {
        T::EVENT_TYPE
    }

    fn validate(&self) -> Vec<String> {
        self.0.validate()
    }

    fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.0)
    }

    fn clone_box(&self) -> Box<dyn ErasedPayload> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        &self.0
    }
}

impl ErasedPayload for GenericPayload {
    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn validate(&self) -> Vec<String> {
        Vec::new()
    }

    fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        Ok(self.data.clone())
    }

    fn clone_box(&self) -> Box<dyn ErasedPayload> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
