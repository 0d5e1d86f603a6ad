// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch outcomes and priority levels

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a handler, a listener or a whole dispatch pass
///
/// Variants are declared in precedence order, so `Ord` ranks them:
/// `Continue < Handled < Consumed < Cancelled < Error`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EventResult {
    /// Nothing happened; keep going
    #[default]
    Continue,
    /// Someone acted on the event; keep going
    Handled,
    /// Someone took ownership; stop
    Consumed,
    /// The event was cancelled; stop
    Cancelled,
    /// A listener failed; stop
    Error,
}

impl EventResult {
    /// Consumed, Cancelled and Error end a dispatch pass
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EventResult::Consumed | EventResult::Cancelled | EventResult::Error
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventResult::Continue => "continue",
            EventResult::Handled => "handled",
            EventResult::Consumed => "consumed",
            EventResult::Cancelled => "cancelled",
            EventResult::Error => "error",
        }
    }
}

impl fmt::Display for EventResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery priority; higher values are notified first
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Priority(pub u8);

impl Priority {
    pub const LOWEST: Priority = Priority(0);
    pub const LOW: Priority = Priority(25);
    pub const NORMAL: Priority = Priority(50);
    pub const HIGH: Priority = Priority(75);
    pub const HIGHEST: Priority = Priority(100);
    pub const CRITICAL: Priority = Priority(200);

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::NORMAL
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Priority::LOWEST => f.write_str("lowest"),
            Priority::LOW => f.write_str("low"),
            Priority::NORMAL => f.write_str("normal"),
            Priority::HIGH => f.write_str("high"),
            Priority::HIGHEST => f.write_str("highest"),
            Priority::CRITICAL => f.write_str("critical"),
            Priority(other) => write!(f, "{}", other),
        }
    }
}
