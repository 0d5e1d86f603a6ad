// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::BusError;
use crate::id::SequentialIdGen;
use serde::{Deserialize, Serialize};
use serde_json::json;
use yare::parameterized;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Attack {
    attacker: u32,
    defender: u32,
    damage: i32,
}

impl EventPayload for Attack {
    const EVENT_TYPE: &'static str = "combat.attack";

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.damage < 0 {
            errors.push("damage must not be negative".to_string());
        }
        if self.attacker == self.defender {
            errors.push("an entity cannot attack itself".to_string());
        }
        errors
    }
}

fn attack(damage: i32) -> Event {
    Event::new(Attack {
        attacker: 1,
        defender: 2,
        damage,
    })
}

#[test]
fn new_event_starts_clean() {
    let event = attack(5);
    assert_eq!(event.event_type(), "combat.attack");
    assert_eq!(event.result(), EventResult::Continue);
    assert!(!event.is_cancelled());
    assert!(!event.is_handled());
    assert!(!event.has_error());
    assert!(event.processed_by().is_empty());
    assert_eq!(event.priority(), Priority::NORMAL);
}

#[test]
fn typed_payload_can_be_borrowed() {
    let event = attack(5);
    let payload = event.payload::<Attack>().unwrap();
    assert_eq!(payload.damage, 5);
    assert!(event.payload::<GenericPayload>().is_none());
}

#[test]
fn validate_collects_payload_errors() {
    let event = Event::new(Attack {
        attacker: 3,
        defender: 3,
        damage: -1,
    });
    assert_eq!(event.validate().len(), 2);
    assert!(attack(1).validate().is_empty());
}

#[test]
fn empty_event_type_is_invalid() {
    let event = Event::simple("  ", json!({}));
    assert_eq!(event.validate(), vec!["event type must not be empty"]);
}

#[test]
fn cancel_twice_stays_cancelled() {
    let event = attack(1);
    event.cancel(Some("player fled"));
    event.cancel(Some("second reason"));
    assert!(event.is_cancelled());
    assert_eq!(event.result(), EventResult::Cancelled);
    assert_eq!(event.cancel_reason().as_deref(), Some("player fled"));
}

#[test]
fn consume_and_handle_both_count_as_handled() {
    let handled = attack(1);
    handled.mark_handled();
    assert!(handled.is_handled());
    assert!(!handled.is_consumed());

    let consumed = attack(1);
    consumed.consume();
    assert!(consumed.is_handled());
    assert!(consumed.is_consumed());
}

#[parameterized(
    handled_after_consumed = { EventResult::Consumed, EventResult::Consumed },
    handled_after_cancelled = { EventResult::Cancelled, EventResult::Cancelled },
    handled_after_error = { EventResult::Error, EventResult::Error },
)]
fn terminal_results_are_never_lowered(terminal: EventResult, expected: EventResult) {
    let event = attack(1);
    match terminal {
        EventResult::Consumed => event.consume(),
        EventResult::Cancelled => event.cancel(None),
        EventResult::Error => event.set_error(BusError::Registration("x".into())),
        _ => unreachable!(),
    }
    event.mark_handled();
    event.consume();
    assert_eq!(event.result(), expected);
}

#[test]
fn set_error_overrides_consumed() {
    let event = attack(1);
    event.consume();
    event.set_error(BusError::Listener {
        listener_id: "l1".to_string(),
        message: "boom".to_string(),
    });
    assert_eq!(event.result(), EventResult::Error);
    assert!(event.has_error());
}

#[test]
fn processed_by_is_ordered_and_deduplicated() {
    let event = attack(1);
    event.mark_processed_by("ui");
    event.mark_processed_by("audio");
    event.mark_processed_by("ui");
    assert_eq!(event.processed_by(), vec!["ui", "audio"]);
}

#[test]
fn clone_fresh_resets_runtime_state() {
    let event = attack(1).with_context(
        EventContext::new()
            .with_source("player")
            .with_priority(Priority::HIGH),
    );
    event.mark_processed_by("combat");
    event.cancel(Some("interrupted"));

    let clone = event.clone_fresh();
    assert_ne!(clone.trace_id(), event.trace_id());
    assert!(clone.processed_by().is_empty());
    assert!(!clone.is_cancelled());
    assert_eq!(clone.result(), EventResult::Continue);
    assert!(clone.cancel_reason().is_none());
    assert_eq!(clone.context().source(), Some("player"));
    assert_eq!(clone.priority(), Priority::HIGH);
    assert_eq!(clone.payload::<Attack>(), event.payload::<Attack>());
}

#[test]
fn context_trace_ids_come_from_generator() {
    let id_gen = SequentialIdGen::new("t");
    let first = EventContext::from_id_gen(&id_gen);
    let second = EventContext::from_id_gen(&id_gen);
    assert_eq!(first.trace_id(), "t-1");
    assert_eq!(second.trace_id(), "t-2");
    assert_ne!(first.clone_fresh().trace_id(), "t-1");
}

#[test]
fn round_trip_without_codec_keeps_type_and_payload() {
    let event = attack(9);
    let decoded = Event::from_value(event.to_value()).unwrap();
    assert_eq!(decoded.event_type(), "combat.attack");
    assert_eq!(decoded.payload_value(), event.payload_value());
    assert_eq!(decoded.trace_id(), event.trace_id());
    let generic = decoded.payload::<GenericPayload>().unwrap();
    assert_eq!(generic.get("damage"), Some(&json!(9)));
}

#[test]
fn round_trip_with_codec_restores_typed_payload() {
    let mut codec = EventCodec::new();
    codec.register::<Attack>();
    assert!(codec.is_registered("combat.attack"));

    let event = attack(4).with_context(EventContext::new().with_target("goblin"));
    let decoded = codec.decode(event.to_value()).unwrap();
    assert_eq!(decoded.payload::<Attack>(), event.payload::<Attack>());
    assert_eq!(decoded.context(), event.context());
}

#[test]
fn decode_mints_trace_id_when_missing() {
    let decoded = Event::from_value(json!({
        "event_type": "ui.click",
        "payload": {"x": 1},
        "context": {"source": "mouse"}
    }))
    .unwrap();
    assert!(!decoded.trace_id().is_empty());
    assert_eq!(decoded.context().source(), Some("mouse"));

    let bare = Event::from_value(json!({"event_type": "ui.click"})).unwrap();
    assert!(!bare.trace_id().is_empty());
}

#[test]
fn decode_rejects_malformed_input() {
    let err = Event::from_value(json!({"payload": {}})).unwrap_err();
    assert!(matches!(err, BusError::Validation { .. }));

    let mut codec = EventCodec::new();
    codec.register::<Attack>();
    let err = codec
        .decode(json!({"event_type": "combat.attack", "payload": {"attacker": "x"}}))
        .unwrap_err();
    assert!(matches!(err, BusError::Validation { event_type, .. } if event_type == "combat.attack"));
}

#[test]
fn result_precedence_orders_variants() {
    assert!(EventResult::Continue < EventResult::Handled);
    assert!(EventResult::Handled < EventResult::Consumed);
    assert!(EventResult::Consumed < EventResult::Cancelled);
    assert!(EventResult::Cancelled < EventResult::Error);
    assert!(!EventResult::Handled.is_terminal());
    assert!(EventResult::Consumed.is_terminal());
}

#[test]
fn priority_levels_are_ordered() {
    assert!(Priority::LOWEST < Priority::LOW);
    assert!(Priority::HIGHEST < Priority::CRITICAL);
    assert_eq!(Priority::CRITICAL.value(), 200);
    assert_eq!(Priority::HIGH.to_string(), "high");
    assert_eq!(Priority(42).to_string(), "42");
}
