//! Bus queue specs
//!
//! Verify deferred dispatch and the drop-oldest bound.

use crate::prelude::*;

#[test]
fn overfull_queue_keeps_the_newest_events() {
    let bus = EventBus::new(BusConfig::new(3)).unwrap();
    let journal = Journal::new();
    let sink = journal.clone();
    bus.register_listener(Arc::new(
        Listener::builder("counter")
            .on("world.tick", move |event| {
                sink.push(event.payload_value()["n"].to_string());
                Ok(EventResult::Handled)
            })
            .build(),
    ))
    .unwrap();

    for n in 0..4 {
        bus.dispatch_async(&Arc::new(Event::simple("world.tick", json!({ "n": n }))));
    }
    assert_eq!(bus.queue_len(), 3);
    assert_eq!(bus.stats().events_dropped, 1);

    assert_eq!(bus.process_queued_events(None), 3);
    assert_eq!(journal.entries(), vec!["1", "2", "3"]);
}

#[test]
fn deferred_events_wait_for_the_host_loop() {
    let bus = EventBus::default();
    let journal = Journal::new();
    bus.register_listener(journal.listener("late", Priority::NORMAL, "world.tick", EventResult::Handled))
        .unwrap();

    assert_eq!(bus.dispatch(&event("world.tick"), false), EventResult::Continue);
    assert!(journal.entries().is_empty());

    bus.process_queued_events(Some(Duration::from_secs(1)));
    assert_eq!(journal.entries(), vec!["late"]);
}
