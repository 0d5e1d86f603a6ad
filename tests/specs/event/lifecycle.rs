//! Event lifecycle specs
//!
//! Verify cancellation, serialization and fresh clones.

use crate::prelude::*;

#[test]
fn cancelling_twice_stays_cancelled() {
    let attack = Event::simple("combat.attack", json!({}));
    attack.cancel(Some("parried"));
    attack.cancel(None);

    assert!(attack.is_cancelled());
    assert_eq!(attack.result(), EventResult::Cancelled);
    assert_eq!(attack.cancel_reason().as_deref(), Some("parried"));
}

#[test]
fn serialized_event_reconstructs_type_and_payload() {
    let original = Event::simple("combat.attack", json!({"attacker": "hero", "damage": 12}));
    let restored = Event::from_value(original.to_value()).unwrap();

    similar_asserts::assert_eq!(restored.event_type(), original.event_type());
    similar_asserts::assert_eq!(restored.payload_value(), original.payload_value());
    assert_eq!(restored.trace_id(), original.trace_id());
}

#[test]
fn fresh_clone_gets_new_identity_and_clean_state() {
    let bus = EventBus::default();
    let journal = Journal::new();
    bus.register_listener(journal.listener("any", Priority::NORMAL, "combat.attack", EventResult::Handled))
        .unwrap();

    let original = event("combat.attack");
    bus.dispatch(&original, true);
    assert_eq!(original.processed_by(), vec!["any"]);

    let copy = original.clone_fresh();
    assert_ne!(copy.trace_id(), original.trace_id());
    assert!(copy.processed_by().is_empty());
    assert_eq!(copy.result(), EventResult::Continue);
    assert_eq!(copy.payload_value(), original.payload_value());
}
