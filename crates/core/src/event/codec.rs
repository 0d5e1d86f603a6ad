// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decoding serialized events back into typed payloads

use super::model::EventEnvelope;
use super::payload::{ErasedPayload, GenericPayload, TypedPayload};
use super::{Event, EventContext, EventPayload};
use crate::error::BusError;
use std::collections::HashMap;
use std::fmt;

type Decoder = fn(serde_json::Value) -> Result<Box<dyn ErasedPayload>, serde_json::Error>;

fn decode_typed<T: EventPayload>(
    value: serde_json::Value,
) -> Result<Box<dyn ErasedPayload>, serde_json::Error> {
    let payload: T = serde_json::from_value(value)?;
    Ok(Box::new(TypedPayload(payload)))
}

/// Registry of payload decoders keyed by event type
///
/// Unregistered types decode into `GenericPayload`, so a round trip always
/// preserves the event type and payload data.
#[derive(Default)]
pub struct EventCodec {
    decoders: HashMap<String, Decoder>,
}

impl EventCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a payload type under its `EVENT_TYPE`
    pub fn register<T: EventPayload>(&mut self) -> &mut Self {
        self.decoders
            .insert(T::EVENT_TYPE.to_string(), decode_typed::<T>);
        self
    }

    pub fn is_registered(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }

    /// Decode an event produced by `Event::to_value`
    ///
    /// A missing context (or trace id) gets a freshly minted one.
    pub fn decode(&self, value: serde_json::Value) -> Result<Event, BusError> {
        let envelope: EventEnvelope =
            serde_json::from_value(value).map_err(|e| BusError::Validation {
                event_type: String::new(),
                errors: vec![format!("malformed event: {}", e)],
            })?;

        let payload: Box<dyn ErasedPayload> = match self.decoders.get(&envelope.event_type) {
            Some(decode) => decode(envelope.payload).map_err(|e| BusError::Validation {
                event_type: envelope.event_type.clone(),
                errors: vec![format!("malformed payload: {}", e)],
            })?,
            None => Box::new(GenericPayload::new(
                envelope.event_type.clone(),
                envelope.payload,
            )),
        };

        let context = envelope.context.unwrap_or_else(EventContext::new);
        Ok(Event::from_parts(payload, context))
    }
}

impl fmt::Debug for EventCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.decoders.keys().collect();
        types.sort();
        f.debug_struct("EventCodec").field("types", &types).finish()
    }
}
