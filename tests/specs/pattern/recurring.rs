//! Recurring event specs
//!
//! Verify capped recurrence with fresh event identities.

use crate::prelude::*;

#[test]
fn recurring_event_fires_three_distinct_copies() {
    let time = ManualTime::new();
    let bus = EventBus::default();
    let journal = Journal::new();
    let sink = journal.clone();
    bus.register_listener(Arc::new(
        Listener::builder("regen")
            .on("player.regen", move |event| {
                sink.push(event.trace_id());
                Ok(EventResult::Handled)
            })
            .build(),
    ))
    .unwrap();

    let template = event("player.regen");
    let pattern = EventPattern::recurring(
        &bus,
        &time.timers,
        Arc::clone(&template),
        Duration::from_secs(5),
        Some(3),
    );
    pattern.start();
    for _ in 0..4 {
        time.advance(Duration::from_secs(5));
    }

    assert_eq!(pattern.state(), PatternState::Completed);
    assert_eq!(pattern.occurrence_count(), 3);

    let mut traces = journal.entries();
    assert_eq!(traces.len(), 3);
    assert!(traces.iter().all(|t| t != template.trace_id()));
    traces.sort();
    traces.dedup();
    assert_eq!(traces.len(), 3);
}

#[test]
fn cancelled_delay_never_fires() {
    let time = ManualTime::new();
    let bus = EventBus::default();
    let journal = Journal::new();
    bus.register_listener(journal.listener("trap", Priority::NORMAL, "trap.spring", EventResult::Handled))
        .unwrap();

    let pattern = EventPattern::delayed(&bus, &time.timers, event("trap.spring"), Duration::from_secs(3));
    pattern.start();
    assert!(pattern.cancel());

    assert_eq!(time.advance(Duration::from_secs(10)), 0);
    assert!(journal.entries().is_empty());
}
