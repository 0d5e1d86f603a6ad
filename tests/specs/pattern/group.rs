//! Event group specs
//!
//! Verify how child outcomes decide a group.

use crate::prelude::*;

fn bus_with_failing(event_type: &str) -> EventBus {
    let bus = EventBus::default();
    bus.register_listener(Arc::new(
        Listener::builder("saboteur")
            .on(event_type, |_| Err("sabotaged".into()))
            .build(),
    ))
    .unwrap();
    bus
}

#[test]
fn group_waiting_for_all_fails_when_one_child_fails() {
    let bus = bus_with_failing("raid.ambush");
    let scout = EventPattern::chain(&bus, vec![event("raid.scout")], true);
    let ambush = EventPattern::chain(&bus, vec![event("raid.ambush")], true);
    let group = EventPattern::group(vec![scout.clone(), ambush.clone()], true);

    group.start();
    assert_eq!(scout.state(), PatternState::Completed);
    assert_eq!(ambush.state(), PatternState::Failed);
    assert_eq!(group.state(), PatternState::Failed);
}

#[test]
fn sequence_runs_children_in_order() {
    let time = ManualTime::new();
    let bus = EventBus::default();
    let journal = Journal::new();
    for step in ["cast.begin", "cast.release"] {
        bus.register_listener(journal.listener(step, Priority::NORMAL, step, EventResult::Handled))
            .unwrap();
    }

    let sequence = EventPattern::sequence(
        vec![
            EventPattern::delayed(&bus, &time.timers, event("cast.begin"), Duration::from_secs(1)),
            EventPattern::delayed(&bus, &time.timers, event("cast.release"), Duration::from_secs(2)),
        ],
        true,
    );
    sequence.start();
    time.advance(Duration::from_secs(1));
    assert_eq!(journal.entries(), vec!["cast.begin"]);
    time.advance(Duration::from_secs(2));

    assert_eq!(journal.entries(), vec!["cast.begin", "cast.release"]);
    assert_eq!(sequence.wait(Duration::from_secs(1)), Ok(PatternState::Completed));
}
