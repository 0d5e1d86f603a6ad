// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event model
//!
//! This module provides:
//! - `Event` - one dispatched unit: type, payload, context and runtime state
//! - `EventContext` - metadata envelope (source, target, priority, trace id)
//! - `EventResult` / `Priority` - dispatch outcome and ordering
//! - `EventPayload` / `GenericPayload` - typed and ad-hoc payloads
//! - `EventCodec` - decodes serialized events back into typed payloads

mod codec;
mod context;
mod model;
mod payload;
mod result;

pub use codec::EventCodec;
pub use context::EventContext;
pub use model::Event;
pub use payload::{EventPayload, GenericPayload};
pub use result::{EventResult, Priority};

#[cfg(test)]
mod tests;
