//! Bus dispatch specs
//!
//! Verify listener ordering, short-circuiting and fault containment.

use crate::prelude::*;

#[test]
fn higher_priority_listener_runs_first_regardless_of_registration() {
    let bus = EventBus::default();
    let journal = Journal::new();
    bus.register_listener(journal.listener("low", Priority::LOW, "combat.attack", EventResult::Continue))
        .unwrap();
    bus.register_listener(journal.listener("high", Priority::HIGH, "combat.attack", EventResult::Continue))
        .unwrap();

    bus.dispatch(&event("combat.attack"), true);
    assert_eq!(journal.entries(), vec!["high", "low"]);
}

#[test]
fn consuming_listener_hides_event_from_lower_priorities() {
    let bus = EventBus::default();
    let journal = Journal::new();
    let consumer = {
        let journal = journal.clone();
        Listener::builder("consumer")
            .priority(Priority::HIGH)
            .on("combat.attack", move |event| {
                journal.push("consumer");
                event.consume();
                Ok(EventResult::Continue)
            })
            .build()
    };
    bus.register_listener(Arc::new(consumer)).unwrap();
    bus.register_listener(journal.listener("bystander", Priority::LOW, "combat.attack", EventResult::Handled))
        .unwrap();

    let attack = event("combat.attack");
    assert_eq!(bus.dispatch(&attack, true), EventResult::Consumed);
    assert_eq!(journal.entries(), vec!["consumer"]);
    assert!(attack.is_consumed());
}

#[test]
fn raising_handler_reports_error_without_escaping() {
    let bus = EventBus::default();
    bus.register_listener(Arc::new(
        Listener::builder("fragile")
            .on("combat.attack", |_| panic!("handler exploded"))
            .build(),
    ))
    .unwrap();

    let attack = event("combat.attack");
    assert_eq!(bus.dispatch(&attack, true), EventResult::Error);
    assert!(attack.has_error());
    assert!(matches!(
        attack.error(),
        Some(BusError::Listener { listener_id, .. }) if listener_id == "fragile"
    ));
}

#[test]
fn death_event_sets_flag_and_counts_one_dispatch() {
    let bus = EventBus::default();
    let died = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&died);
    bus.register_listener(Arc::new(
        Listener::builder("mortician")
            .on("combat.death", move |_| {
                *flag.lock().unwrap() = true;
                Ok(EventResult::Handled)
            })
            .build(),
    ))
    .unwrap();

    let death = Arc::new(Event::simple("combat.death", json!({"entity": "goblin-7"})));
    bus.dispatch(&death, true);

    assert!(*died.lock().unwrap());
    assert_eq!(bus.stats().events_dispatched, 1);
}

#[test]
fn shut_down_bus_fails_soft() {
    let bus = EventBus::default();
    let journal = Journal::new();
    bus.register_listener(journal.listener("any", Priority::NORMAL, "combat.attack", EventResult::Handled))
        .unwrap();
    bus.shutdown();

    assert_eq!(bus.dispatch(&event("combat.attack"), true), EventResult::Continue);
    assert!(!bus.set_enabled(true));
    assert!(journal.entries().is_empty());
}
