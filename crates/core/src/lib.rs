// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tidings-core: in-process publish/subscribe event bus
//!
//! This crate provides:
//! - The event model (`Event`, `EventContext`, `EventResult`, `Priority`)
//! - Listeners and the priority-ordered `ListenerRegistry`
//! - `EventBus`: filters, hooks, a bounded queue and dispatch statistics
//! - Pluggable dispatch strategies (synchronous, threaded, queued, priority, async)
//! - Event patterns (chains, conditionals, delays, recurrence, sequences, groups)
//!   driven by cancellable `Timers`

pub mod clock;
pub mod id;

mod error;

pub mod bus;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod listener;
pub mod pattern;
pub mod timer;

// Re-exports
pub use bus::{BusStats, EventBus, EventFilter, PostDispatchHook, PreDispatchHook};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{BusConfig, DispatcherConfig, DispatcherKind};
pub use dispatch::{
    AsyncEventDispatcher, DispatcherStats, EventDispatcher, PriorityDispatcher, QueuedDispatcher,
    SynchronousDispatcher, ThreadedDispatcher,
};
pub use error::BusError;
pub use event::{
    Event, EventCodec, EventContext, EventPayload, EventResult, GenericPayload, Priority,
};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use listener::{EventListener, HandlerResult, Listener, ListenerBuilder, ListenerRegistry};
pub use pattern::{EventPattern, PatternKind, PatternState};
pub use timer::{TimerDriver, TimerId, Timers};
